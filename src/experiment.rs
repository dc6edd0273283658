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
use crate::benchmark::Benchmark;
use crate::benchmark::TimingRecord;
use crate::benchmark::append_timing_record;
use crate::error::HarnessError;
use crate::error::StreamError;
use crate::identity::ResourceUsage;
use crate::identity::RunIdentity;
use crate::logging::LoggingGuard;
use crate::logging::setup_tracing;
use crate::options::OptionGroups;
use crate::options::ParsedOptions;
use crate::options::augment;
use crate::output::OutputOptions;
use crate::render::render_footer;
use crate::render::render_header;
use crate::render::render_params;
use crate::stream::InputStream;
use crate::stream::OpenMode;
use crate::stream::OutputStream;
use crate::stream::Streams;
use clap::ArgMatches;
use clap::Command;
use rand::RngCore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fmt;
use std::io::Write;
use uuid::Uuid;

/// A started experiment: parsed options, resolved streams, logging and timers.
///
/// Created by [`Experiment::start`], finished by [`Experiment::stop`], which
/// consumes it. Everything a script needs between the two is reached through
/// this value.
pub struct Experiment {
  identity: RunIdentity,
  argv: Vec<String>,
  options: ParsedOptions,
  benchmark: Benchmark,
  rng: StdRng,
  seed: u64,
  _logging: LoggingGuard,
}

impl Experiment {
  /// Starts an experiment from the process arguments.
  ///
  /// Exits the process with a usage message if the arguments do not parse.
  pub fn start(command: Command, groups: OptionGroups) -> Result<Self, HarnessError> {
    let argv = std::env::args_os()
      .map(|arg| arg.to_string_lossy().into_owned())
      .collect::<Vec<_>>();
    Self::start_from(command, groups, argv)
  }

  /// Like [`Experiment::start`], with an explicit argument vector (program name first).
  pub fn start_from<I, T>(
    command: Command,
    groups: OptionGroups,
    argv: I,
  ) -> Result<Self, HarnessError>
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    let identity = RunIdentity::capture();
    let argv = argv.into_iter().map(Into::into).collect::<Vec<String>>();

    let mut command = augment(command, groups);
    let matches = command
      .try_get_matches_from_mut(&argv)
      .unwrap_or_else(|err| err.exit());
    let mut options = ParsedOptions::from_matches(&command, matches, groups);

    let seed = match options.random_seed {
      Some(seed) => seed,
      None => rand::rng().next_u64(),
    };
    let rng = StdRng::seed_from_u64(seed);

    if let Some(pipes) = &options.pipes {
      let streams = Streams::resolve(pipes)?;
      options.streams = streams;
    }

    let logging = setup_tracing(&options)?;

    tracing::info!("{}", render_header(&identity, &argv));
    tracing::info!("{}", render_params(&options.parameters()));
    tracing::debug!(seed, "Random number generator seeded");

    let benchmark = Benchmark::new(options.streams.stdlog.clone());

    Ok(Self {
      identity,
      argv,
      options,
      benchmark,
      rng,
      seed,
      _logging: logging,
    })
  }

  pub fn options(&self) -> &ParsedOptions {
    &self.options
  }

  /// The matches of the caller's command, including its own arguments.
  pub fn matches(&self) -> &ArgMatches {
    self.options.matches()
  }

  pub fn argv(&self) -> &[String] {
    &self.argv
  }

  pub fn stdin(&mut self) -> &mut InputStream {
    &mut self.options.streams.stdin
  }

  pub fn stdout(&self) -> OutputStream {
    self.options.streams.stdout.clone()
  }

  pub fn stderr(&self) -> OutputStream {
    self.options.streams.stderr.clone()
  }

  pub fn stdlog(&self) -> OutputStream {
    self.options.streams.stdlog.clone()
  }

  /// Opens the output for `section`, truncating.
  pub fn open_output(&self, section: &str) -> Result<OutputStream, StreamError> {
    self.open_output_with(section, OpenMode::Write)
  }

  /// Opens the output for `section` through `-P`/`-F`, or `%s` without overwrite when
  /// the output options were not requested.
  pub fn open_output_with(
    &self,
    section: &str,
    mode: OpenMode,
  ) -> Result<OutputStream, StreamError> {
    let stdout = &self.options.streams.stdout;
    match &self.options.output {
      Some(output) => output.open(section, mode, stdout),
      None => OutputOptions::default().open(section, mode, stdout),
    }
  }

  pub fn benchmark(&self) -> &Benchmark {
    &self.benchmark
  }

  /// The experiment's random number generator, seeded from `--random-seed` or at random.
  pub fn rng(&mut self) -> &mut StdRng {
    &mut self.rng
  }

  pub fn seed(&self) -> u64 {
    self.seed
  }

  pub fn run_id(&self) -> Uuid {
    self.identity.run_id()
  }

  pub fn identity(&self) -> &RunIdentity {
    &self.identity
  }

  /// Writes the benchmark summary and footer, closes redirected streams and
  /// appends the timing record.
  pub fn stop(self) -> Result<(), HarnessError> {
    let streams = &self.options.streams;
    let table = self.benchmark.table();

    if self.options.verbosity >= 1 && !table.is_empty() {
      let mut log = streams.stdlog.clone();
      log.write_all(table.render_summary(self.identity.elapsed()).as_bytes())?;
    }

    tracing::info!(
      "{}",
      render_footer(&self.identity, &ResourceUsage::current())
    );

    for stream in [&streams.stdout, &streams.stderr] {
      if !stream.source().is_standard() {
        stream.close()?;
      }
    }
    streams.stdlog.clone().flush()?;

    let timeit = &self.options.timeit;
    if let Some(path) = &timeit.file {
      let cmd = self.argv.first().map(String::as_str).unwrap_or_default();
      let record = TimingRecord::capture(&timeit.name, &self.identity, cmd);
      append_timing_record(path, timeit.header, &record)?;
    }

    Ok(())
  }
}

impl fmt::Debug for Experiment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Experiment")
      .field("run_id", &self.identity.run_id())
      .field("argv", &self.argv)
      .field("seed", &self.seed)
      .finish_non_exhaustive()
  }
}
