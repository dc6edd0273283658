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
use clap::Parser;

/// Arguments of the `runrecord` binary. The harness options are added on
/// top of these when the experiment starts.
#[derive(Debug, Parser)]
#[command(
  name = "runrecord",
  version,
  about = "Run a shell statement inside a recorded experiment"
)]
pub struct Cli {
  /// Write the statement's standard output to the resolved stdout stream.
  #[arg(long)]
  pub capture: bool,

  /// Keep the captured output of a failing statement instead of failing.
  #[arg(long, requires = "capture")]
  pub ignore_errors: bool,

  /// Count lines, words and characters of stdin into output section SECTION.
  #[arg(long, value_name = "SECTION")]
  pub tally: Option<String>,

  /// The shell statement to run. Words are joined with spaces.
  #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
  pub statement: Vec<String>,
}
