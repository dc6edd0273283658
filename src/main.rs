// Copyright 2025 Chisomo Makombo Sakala
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use anyhow::Result;
use clap::CommandFactory;
use clap::FromArgMatches;
use runrecord::cli::Cli;
use runrecord::command::OnError;
use runrecord::command::ShellCommand;
use runrecord::counter::Counter;
use runrecord::counter::TableLayout;
use runrecord::experiment::Experiment;
use runrecord::options::OptionGroups;
use std::io::BufRead;
use std::io::Write;

fn main() -> Result<()> {
  let groups = OptionGroups::default().with_pipe().with_output();
  let mut experiment = Experiment::start(Cli::command(), groups)?;
  let cli = Cli::from_arg_matches(experiment.matches())?;

  let main_span = tracing::info_span!("runrecord");
  let _enter = main_span.enter();

  if let Some(section) = &cli.tally {
    tally(&mut experiment, section)?;
  }

  if !cli.statement.is_empty() {
    let statement = cli.statement.join(" ");
    let benchmark = experiment.benchmark().clone();
    benchmark.time("statement", || run_statement(&experiment, &statement, &cli))?;
  }

  drop(_enter);
  experiment.stop()?;
  Ok(())
}

#[tracing::instrument(skip(experiment, cli))]
fn run_statement(experiment: &Experiment, statement: &str, cli: &Cli) -> Result<()> {
  let command = ShellCommand::new(statement)?;

  if cli.capture {
    let on_error = if cli.ignore_errors {
      OnError::Ignore
    } else {
      OnError::Raise
    };
    let output = command.stdout(on_error)?;
    let mut stdout = experiment.stdout();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
  } else {
    command.status()?;
  }

  tracing::info!("Statement completed");
  Ok(())
}

/// Counts lines, words, characters and empty lines of stdin into `section`.
#[tracing::instrument(skip(experiment))]
fn tally(experiment: &mut Experiment, section: &str) -> Result<()> {
  let mut counts: Counter = [("lines", 0), ("words", 0), ("chars", 0), ("empty", 0)]
    .into_iter()
    .collect();

  let stdin = experiment.stdin();
  let mut line = String::new();
  while stdin.read_line(&mut line)? > 0 {
    let text = line.trim_end_matches(['\n', '\r']);
    counts["lines"] += 1;
    counts["words"] += text.split_whitespace().count() as i64;
    counts["chars"] += text.chars().count() as i64;
    if text.trim().is_empty() {
      counts["empty"] += 1;
    }
    line.clear();
  }
  tracing::debug!(%counts, "Input tallied");

  let mut out = experiment.open_output(section)?;
  writeln!(out, "{}", counts.as_table(TableLayout::Rows))?;
  if out.shares_sink_with(&experiment.stdout()) {
    out.flush()?;
  } else {
    out.close()?;
  }
  Ok(())
}
