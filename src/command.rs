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
use crate::error::CommandError;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;

/// Shell used for plain statements.
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Shell used for process substitution when `$SHELL` is unset.
pub const DEFAULT_BASH: &str = "/bin/bash";

/// What to do when a statement fails while its output is being captured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnError {
  #[default]
  Raise,
  /// Return whatever the statement printed.
  Ignore,
}

/// A shell statement, ready to run in one of four result modes.
///
/// Multi-line statements are joined into one line. Statements using process
/// substitution (`<(...)`) need bash and run under `$SHELL`; everything
/// else runs under `/bin/sh -c`.
#[derive(Debug, Clone)]
pub struct ShellCommand {
  statement: String,
  shell: String,
  current_dir: Option<PathBuf>,
  envs: Vec<(OsString, OsString)>,
}

impl ShellCommand {
  pub fn new(statement: &str) -> Result<Self, CommandError> {
    let shell = std::env::var("SHELL").unwrap_or_else(|_| DEFAULT_BASH.to_string());
    Self::with_shell(statement, &shell)
  }

  /// Like [`ShellCommand::new`], with `shell` standing in for `$SHELL`.
  pub fn with_shell(statement: &str, shell: &str) -> Result<Self, CommandError> {
    let statement = normalize_statement(statement);

    let shell = if statement.contains("<(") {
      if !shell.contains("bash") {
        return Err(CommandError::ProcessSubstitution {
          shell: shell.to_string(),
        });
      }
      shell.to_string()
    } else {
      DEFAULT_SHELL.to_string()
    };

    Ok(Self {
      statement,
      shell,
      current_dir: None,
      envs: Vec::new(),
    })
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.current_dir = Some(dir.into());
    self
  }

  pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
    self.envs.push((key.into(), value.into()));
    self
  }

  pub fn statement(&self) -> &str {
    &self.statement
  }

  pub fn shell(&self) -> &str {
    &self.shell
  }

  fn command(&self) -> Command {
    let mut command = Command::new(&self.shell);
    command.arg("-c").arg(&self.statement);
    if let Some(dir) = &self.current_dir {
      command.current_dir(dir);
    }
    command.envs(self.envs.iter().map(|(k, v)| (k, v)));
    command
  }

  fn spawn_err(&self, source: std::io::Error) -> CommandError {
    CommandError::Spawn {
      statement: self.statement.clone(),
      source,
    }
  }

  /// Runs the statement and returns its exit code, which is always 0 on success.
  pub fn status(&self) -> Result<i32, CommandError> {
    tracing::debug!(statement = %self.statement, "Running statement");
    let status = self
      .command()
      .status()
      .map_err(|source| self.spawn_err(source))?;
    check_status(&self.statement, status)
  }

  /// Runs the statement and returns its standard output.
  ///
  /// With [`OnError::Ignore`], the output is returned even if the
  /// statement failed.
  pub fn stdout(&self, on_error: OnError) -> Result<String, CommandError> {
    tracing::debug!(statement = %self.statement, "Running statement, capturing stdout");
    let output = self
      .command()
      .stderr(Stdio::inherit())
      .output()
      .map_err(|source| self.spawn_err(source))?;

    if on_error == OnError::Raise {
      check_status(&self.statement, output.status)?;
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }

  /// Runs the statement and returns its standard error, whatever the exit status.
  pub fn stderr(&self) -> Result<String, CommandError> {
    tracing::debug!(statement = %self.statement, "Running statement, capturing stderr");
    let output = self
      .command()
      .output()
      .map_err(|source| self.spawn_err(source))?;
    Ok(String::from_utf8_lossy(&output.stderr).into_owned())
  }

  /// Starts the statement and hands the child process to the caller.
  pub fn spawn(&self) -> Result<Child, CommandError> {
    tracing::debug!(statement = %self.statement, "Spawning statement");
    self
      .command()
      .spawn()
      .map_err(|source| self.spawn_err(source))
  }
}

/// Runs `statement` and returns its exit code.
///
/// Fails if the process exits with a nonzero code or is killed by a signal.
pub fn run(statement: &str) -> Result<i32, CommandError> {
  ShellCommand::new(statement)?.status()
}

/// Collapses tab runs to one space, joins lines with spaces and trims.
pub fn normalize_statement(statement: &str) -> String {
  let mut normalized = String::with_capacity(statement.len());
  let mut in_tabs = false;
  for c in statement.chars() {
    match c {
      '\t' if in_tabs => {}
      '\t' => {
        in_tabs = true;
        normalized.push(' ');
      }
      '\n' => {
        in_tabs = false;
        normalized.push(' ');
      }
      c => {
        in_tabs = false;
        normalized.push(c);
      }
    }
  }
  normalized.trim().to_string()
}

fn check_status(statement: &str, status: ExitStatus) -> Result<i32, CommandError> {
  match status.code() {
    Some(0) => Ok(0),
    Some(code) => Err(CommandError::ExitCode {
      code,
      statement: statement.to_string(),
    }),
    None => Err(CommandError::Signal {
      signal: exit_signal(&status),
      statement: statement.to_string(),
    }),
  }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> i32 {
  use std::os::unix::process::ExitStatusExt;
  status.signal().unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> i32 {
  -1
}
