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
use crate::output::OutputOptions;
use crate::stream::PipePaths;
use crate::stream::Streams;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap::ValueEnum;
use clap::value_parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Default location of the logging configuration file.
pub const DEFAULT_LOG_CONFIG: &str = "logging.yml";

/// Environment variable consulted for `--log-config-filename`.
pub const LOG_CONFIG_ENV: &str = "RUNRECORD_LOG_CONFIG";

/// Optional option groups a script asks for, plus `quiet`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionGroups {
  pub csv: bool,
  pub database: bool,
  pub pipe: bool,
  pub cluster: bool,
  pub output: bool,
  /// Default verbosity becomes 0 instead of 1.
  pub quiet: bool,
}

impl OptionGroups {
  pub fn with_csv(mut self) -> Self {
    self.csv = true;
    self
  }

  pub fn with_database(mut self) -> Self {
    self.database = true;
    self
  }

  pub fn with_pipe(mut self) -> Self {
    self.pipe = true;
    self
  }

  pub fn with_cluster(mut self) -> Self {
    self.cluster = true;
    self
  }

  pub fn with_output(mut self) -> Self {
    self.output = true;
    self
  }

  pub fn quiet(mut self) -> Self {
    self.quiet = true;
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TraceMode {
  /// Print every span creation with its caller.
  Function,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueueManager {
  Sge,
  Slurm,
  Torque,
  Pbspro,
}

/// `--timeit`, `--timeit-name` and `--timeit-header`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeitOptions {
  pub file: Option<PathBuf>,
  pub name: String,
  pub header: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterOptions {
  pub without_cluster: bool,
  pub queue_manager: QueueManager,
  pub priority: Option<i32>,
  pub queue: Option<String>,
  pub num_jobs: Option<usize>,
  pub parallel_environment: Option<String>,
  pub options: Option<String>,
  pub memory_resource: Option<String>,
  pub memory_default: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseOptions {
  pub url: String,
  pub schema: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
  pub dialect: String,
}

/// Adds the harness options to a caller-built command.
///
/// The standard options are always added; each optional group only when
/// requested. Clap reports duplicate ids or flags as a programming error.
pub fn augment(mut command: Command, groups: OptionGroups) -> Command {
  let default_verbosity = if groups.quiet { "0" } else { "1" };

  command = command
    .next_help_heading("Script timing options")
    .arg(
      Arg::new("timeit_file")
        .long("timeit")
        .value_name("PATH")
        .value_parser(value_parser!(PathBuf))
        .help("Store timing information in file"),
    )
    .arg(
      Arg::new("timeit_name")
        .long("timeit-name")
        .default_value("all")
        .help("Name in timing file for this class of jobs"),
    )
    .arg(
      Arg::new("timeit_header")
        .long("timeit-header")
        .action(ArgAction::SetTrue)
        .help("Add header for timing information"),
    )
    .next_help_heading("Common options")
    .arg(
      Arg::new("random_seed")
        .long("random-seed")
        .value_parser(value_parser!(u64))
        .help("Random seed to initialize the number generator with"),
    )
    .arg(
      Arg::new("loglevel")
        .short('v')
        .long("verbose")
        .value_parser(value_parser!(u8))
        .default_value(default_verbosity)
        .help("Loglevel. 0 logs errors only, 1 informational, 2 or more debug"),
    )
    .arg(
      Arg::new("log_config_filename")
        .long("log-config-filename")
        .env(LOG_CONFIG_ENV)
        .value_parser(value_parser!(PathBuf))
        .default_value(DEFAULT_LOG_CONFIG)
        .help("Configuration file for logger"),
    )
    .arg(
      Arg::new("tracing")
        .long("tracing")
        .value_parser(value_parser!(TraceMode))
        .help("Enable function tracing"),
    )
    .arg(
      Arg::new("short_help")
        .short('?')
        .action(ArgAction::HelpShort)
        .help("Output short help (command line options only)"),
    );

  if groups.csv {
    command = command.arg(
      Arg::new("csv_dialect")
        .long("csv-dialect")
        .default_value("excel-tab")
        .help("CSV dialect to use"),
    );
  }

  if groups.cluster {
    command = command
      .next_help_heading("Cluster options")
      .arg(
        Arg::new("without_cluster")
          .long("no-cluster")
          .visible_alias("local")
          .action(ArgAction::SetTrue)
          .help("Do not use the cluster, run locally"),
      )
      .arg(
        Arg::new("cluster_priority")
          .long("cluster-priority")
          .allow_negative_numbers(true)
          .value_parser(value_parser!(i32))
          .help("Job priority on the cluster"),
      )
      .arg(
        Arg::new("cluster_queue")
          .long("cluster-queue")
          .help("Cluster queue"),
      )
      .arg(
        Arg::new("cluster_num_jobs")
          .long("cluster-num-jobs")
          .value_parser(value_parser!(usize))
          .help("Number of jobs to submit to the queue in parallel"),
      )
      .arg(
        Arg::new("cluster_parallel_environment")
          .long("cluster-parallel")
          .visible_alias("cluster-parallel-environment")
          .help("Name of the parallel environment to use"),
      )
      .arg(
        Arg::new("cluster_options")
          .long("cluster-options")
          .allow_hyphen_values(true)
          .help("Additional options passed on to the queuing system"),
      )
      .arg(
        Arg::new("cluster_queue_manager")
          .long("cluster-queue-manager")
          .value_parser(value_parser!(QueueManager))
          .default_value("sge")
          .help("Cluster queuing system"),
      )
      .arg(
        Arg::new("cluster_memory_resource")
          .long("cluster-memory-resource")
          .help("Resource name to allocate memory with"),
      )
      .arg(
        Arg::new("cluster_memory_default")
          .long("cluster-memory-default")
          .default_value("unlimited")
          .help("Default amount of memory to allocate"),
      );
  }

  if groups.output || groups.pipe {
    command = command.next_help_heading("Input/output options");
  }

  if groups.output {
    command = command
      .arg(
        Arg::new("output_filename_pattern")
          .short('P')
          .long("output-filename-pattern")
          .default_value("%s")
          .help("Output filename pattern; %s is replaced by the section name"),
      )
      .arg(
        Arg::new("output_force")
          .short('F')
          .long("force-output")
          .action(ArgAction::SetTrue)
          .help("Force overwriting of existing files"),
      );
  }

  if groups.pipe {
    command = command
      .arg(
        Arg::new("stdin")
          .short('I')
          .long("stdin")
          .value_parser(value_parser!(PathBuf))
          .help("File to read stdin from [default = stdin]"),
      )
      .arg(
        Arg::new("stdlog")
          .short('L')
          .long("log")
          .value_parser(value_parser!(PathBuf))
          .help("File with logging information [default = stdout]"),
      )
      .arg(
        Arg::new("stderr")
          .short('E')
          .long("error")
          .value_parser(value_parser!(PathBuf))
          .help("File with error information [default = stderr]"),
      )
      .arg(
        Arg::new("stdout")
          .short('S')
          .long("stdout")
          .value_parser(value_parser!(PathBuf))
          .help("File where output is to go [default = stdout]"),
      );
  }

  if groups.database {
    command = command
      .next_help_heading("Database connection options")
      .arg(
        Arg::new("database_url")
          .long("database-url")
          .default_value("sqlite:///./csvdb")
          .help("Database connection url, for example sqlite:///./csvdb"),
      )
      .arg(
        Arg::new("database_schema")
          .long("database-schema")
          .help("Database schema"),
      );
  }

  command
}

/// Parsed command line: the raw matches plus typed views of the harness options.
#[derive(Debug)]
pub struct ParsedOptions {
  matches: ArgMatches,
  arg_ids: Vec<String>,
  pub verbosity: u8,
  pub log_config: Option<PathBuf>,
  pub timeit: TimeitOptions,
  pub random_seed: Option<u64>,
  pub tracing: Option<TraceMode>,
  pub output: Option<OutputOptions>,
  pub pipes: Option<PipePaths>,
  pub cluster: Option<ClusterOptions>,
  pub database: Option<DatabaseOptions>,
  pub csv: Option<CsvOptions>,
  pub streams: Streams,
}

impl ParsedOptions {
  /// Extracts the harness options from `matches`.
  ///
  /// `command` must be the augmented command the matches came from; its
  /// argument ids are kept for [`ParsedOptions::parameters`]. Streams start
  /// out as the real standard streams.
  pub fn from_matches(command: &Command, matches: ArgMatches, groups: OptionGroups) -> Self {
    let arg_ids = command
      .get_arguments()
      .map(|arg| arg.get_id().to_string())
      .collect();

    let log_config = matches
      .get_one::<PathBuf>("log_config_filename")
      .filter(|path| !(path.as_os_str() == DEFAULT_LOG_CONFIG && !path.exists()))
      .cloned();

    let timeit = TimeitOptions {
      file: matches.get_one::<PathBuf>("timeit_file").cloned(),
      name: string_value(&matches, "timeit_name").unwrap_or_else(|| "all".to_string()),
      header: matches.get_flag("timeit_header"),
    };

    let output = groups.output.then(|| OutputOptions {
      pattern: string_value(&matches, "output_filename_pattern")
        .unwrap_or_else(|| OutputOptions::default().pattern),
      force: matches.get_flag("output_force"),
    });

    let pipes = groups.pipe.then(|| PipePaths {
      stdin: matches.get_one::<PathBuf>("stdin").cloned(),
      stdout: matches.get_one::<PathBuf>("stdout").cloned(),
      stderr: matches.get_one::<PathBuf>("stderr").cloned(),
      stdlog: matches.get_one::<PathBuf>("stdlog").cloned(),
    });

    let cluster = groups.cluster.then(|| ClusterOptions {
      without_cluster: matches.get_flag("without_cluster"),
      queue_manager: matches
        .get_one::<QueueManager>("cluster_queue_manager")
        .copied()
        .unwrap_or(QueueManager::Sge),
      priority: matches.get_one::<i32>("cluster_priority").copied(),
      queue: string_value(&matches, "cluster_queue"),
      num_jobs: matches.get_one::<usize>("cluster_num_jobs").copied(),
      parallel_environment: string_value(&matches, "cluster_parallel_environment"),
      options: string_value(&matches, "cluster_options"),
      memory_resource: string_value(&matches, "cluster_memory_resource"),
      memory_default: string_value(&matches, "cluster_memory_default")
        .unwrap_or_else(|| "unlimited".to_string()),
    });

    let database = groups.database.then(|| DatabaseOptions {
      url: string_value(&matches, "database_url")
        .unwrap_or_else(|| "sqlite:///./csvdb".to_string()),
      schema: string_value(&matches, "database_schema"),
    });

    let csv = groups.csv.then(|| CsvOptions {
      dialect: string_value(&matches, "csv_dialect").unwrap_or_else(|| "excel-tab".to_string()),
    });

    Self {
      verbosity: matches.get_one::<u8>("loglevel").copied().unwrap_or(1),
      log_config,
      timeit,
      random_seed: matches.get_one::<u64>("random_seed").copied(),
      tracing: matches.get_one::<TraceMode>("tracing").copied(),
      output,
      pipes,
      cluster,
      database,
      csv,
      streams: Streams::standard(),
      arg_ids,
      matches,
    }
  }

  /// The full matches, for the caller's own arguments.
  pub fn matches(&self) -> &ArgMatches {
    &self.matches
  }

  /// Every argument that has a value (given or defaulted) with its raw
  /// command line text, plus the resolved streams.
  pub fn parameters(&self) -> BTreeMap<String, String> {
    let mut params: BTreeMap<String, String> = self
      .arg_ids
      .iter()
      .filter_map(|id| {
        let values = self.matches.try_get_raw(id).ok().flatten()?;
        let joined = values
          .map(|value| value.to_string_lossy().into_owned())
          .collect::<Vec<_>>()
          .join(",");
        Some((id.clone(), joined))
      })
      .collect();

    let streams = &self.streams;
    params.insert("stdin".to_string(), streams.stdin.source().to_string());
    params.insert("stdout".to_string(), streams.stdout.source().to_string());
    params.insert("stderr".to_string(), streams.stderr.source().to_string());
    params.insert("stdlog".to_string(), streams.stdlog.source().to_string());
    params
  }
}

fn string_value(matches: &ArgMatches, id: &str) -> Option<String> {
  matches.get_one::<String>(id).cloned()
}
