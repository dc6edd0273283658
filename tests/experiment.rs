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
use clap::Arg;
use clap::Command;
use rand::RngCore;
use runrecord::experiment::Experiment;
use runrecord::identity::run_id;
use runrecord::options::OptionGroups;
use runrecord::options::QueueManager;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

fn start(dir: &Path, groups: OptionGroups, args: &[&str]) -> Experiment {
  start_command(dir, Command::new("prog"), groups, args)
}

/// Starts with the log redirected to `run.log` in `dir`.
fn start_command(
  dir: &Path,
  command: Command,
  groups: OptionGroups,
  args: &[&str],
) -> Experiment {
  let log = dir.join("run.log");
  let mut argv = vec!["prog", "-L", log.to_str().unwrap()];
  argv.extend_from_slice(args);
  Experiment::start_from(command, groups.with_pipe(), argv).unwrap()
}

#[test]
fn test_lifecycle_writes_header_params_and_footer() {
  let temp = tempdir().unwrap();
  let experiment = start(temp.path(), OptionGroups::default(), &["--verbose=2"]);
  let id = experiment.run_id().to_string();
  assert_eq!(experiment.run_id(), run_id());
  experiment.stop().unwrap();

  let log = fs::read_to_string(temp.path().join("run.log")).unwrap();
  assert!(log.contains("output generated by prog -L"));
  assert!(log.contains("--verbose=2"));
  assert!(log.contains(&format!("-- {id}")));
  assert!(log.contains("job finished in"));
  assert!(log.contains("loglevel"));
  assert_eq!(log.matches(id.as_str()).count(), 2);
}

#[test]
fn test_caller_arguments_and_parameters() {
  let temp = tempdir().unwrap();
  let command = Command::new("prog").arg(
    Arg::new("method")
      .long("method")
      .default_value("fast"),
  );
  let groups = OptionGroups::default().with_cluster().with_database().with_csv();
  let experiment = start_command(
    temp.path(),
    command,
    groups,
    &["--method", "slow", "--cluster-priority", "-5", "--local"],
  );

  assert_eq!(
    experiment.matches().get_one::<String>("method").unwrap(),
    "slow"
  );

  let options = experiment.options();
  let cluster = options.cluster.as_ref().unwrap();
  assert_eq!(cluster.priority, Some(-5));
  assert!(cluster.without_cluster);
  assert_eq!(cluster.queue_manager, QueueManager::Sge);
  assert_eq!(options.database.as_ref().unwrap().url, "sqlite:///./csvdb");
  assert_eq!(options.csv.as_ref().unwrap().dialect, "excel-tab");

  let params = options.parameters();
  assert_eq!(params["loglevel"], "1");
  assert_eq!(params["cluster_priority"], "-5");
  assert_eq!(params["stdin"], "<stdin>");
  assert!(params["stdlog"].ends_with("run.log"));
  experiment.stop().unwrap();
}

#[test]
fn test_random_seed_is_reproducible() {
  let temp = tempdir().unwrap();

  let mut first = start(temp.path(), OptionGroups::default(), &["--random-seed", "42"]);
  let mut second = start(temp.path(), OptionGroups::default(), &["--random-seed", "42"]);
  assert_eq!(first.seed(), 42);
  assert_eq!(first.rng().next_u64(), second.rng().next_u64());
  first.stop().unwrap();
  second.stop().unwrap();
}

#[test]
fn test_open_output_through_pattern() {
  let temp = tempdir().unwrap();
  let pattern = temp.path().join("out").join("sample_%s.tsv");
  let pattern = pattern.to_str().unwrap();

  let experiment = start(
    temp.path(),
    OptionGroups::default().with_output(),
    &["-P", pattern],
  );
  let mut out = experiment.open_output("histogram").unwrap();
  writeln!(out, "bin\tcount").unwrap();
  out.close().unwrap();
  assert!(experiment.open_output("histogram").is_err());
  experiment.stop().unwrap();

  let path = temp.path().join("out").join("sample_histogram.tsv");
  assert_eq!(fs::read_to_string(path).unwrap(), "bin\tcount\n");
}

#[test]
fn test_stop_writes_summary_and_timing_record() {
  let temp = tempdir().unwrap();
  let timings = temp.path().join("timings.tsv");
  let stdout = temp.path().join("out.tsv.gz");

  let experiment = start(
    temp.path(),
    OptionGroups::default(),
    &[
      "--timeit",
      timings.to_str().unwrap(),
      "--timeit-header",
      "-S",
      stdout.to_str().unwrap(),
    ],
  );
  let value = experiment.benchmark().time("work", || 6 * 7);
  assert_eq!(value, 42);
  writeln!(experiment.stdout(), "result\t{value}").unwrap();
  experiment.stop().unwrap();

  let log = fs::read_to_string(temp.path().join("run.log")).unwrap();
  assert!(log.contains("## benchmark: work completed in"));
  assert!(log.contains("# work\t"));

  let rows = fs::read_to_string(&timings).unwrap();
  let rows: Vec<&str> = rows.lines().collect();
  assert_eq!(rows.len(), 2);
  assert!(rows[1].starts_with("all\t"));
  assert!(rows[1].ends_with("\tprog"));

  let compressed = fs::read(&stdout).unwrap();
  assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
}
