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
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error enum for the runrecord library.
#[derive(Error, Debug)]
pub enum HarnessError {
  #[error("Stream error")]
  Stream(#[from] StreamError),

  #[error("Logging setup failed")]
  Logging(#[from] LoggingError),

  #[error("Command failed")]
  Command(#[from] CommandError),

  #[error("Remote store error")]
  Remote(#[from] RemoteError),

  #[error("Failed to append timing record to {path}")]
  TimingFile {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),
}

/// Errors related to opening and closing streams (src/stream.rs, src/output.rs).
#[derive(Error, Debug)]
pub enum StreamError {
  #[error("Failed to open {path}")]
  Open {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to create directory {path}")]
  CreateDir {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("file {path} already exists, use --force-output to overwrite existing files.")]
  OutputExists { path: PathBuf },

  #[error("Failed to close stream {name}")]
  Close {
    name: String,
    #[source]
    source: std::io::Error,
  },
}

/// Errors related to logging configuration (src/config.rs, src/logging.rs).
#[derive(Error, Debug)]
pub enum LoggingError {
  #[error("file {path} with logging configuration does not exist")]
  MissingConfig { path: PathBuf },

  #[error("Failed to parse logging configuration {path}")]
  ParseConfig {
    path: PathBuf,
    #[source]
    source: Box<figment::Error>,
  },

  #[error("Unknown log level '{level}'")]
  InvalidLevel { level: String },

  #[error("Logger '{logger}' refers to unknown handler '{handler}'")]
  UnknownHandler { logger: String, handler: String },

  #[error("Handler '{handler}' refers to unknown formatter '{formatter}'")]
  UnknownFormatter { handler: String, formatter: String },

  #[error("Invalid filter directives '{directives}'")]
  Directives {
    directives: String,
    #[source]
    source: tracing_subscriber::filter::ParseError,
  },

  #[error("Log file path has no file name: {path}")]
  LogFileName { path: PathBuf },
}

/// Errors related to running shell statements (src/command.rs).
#[derive(Error, Debug)]
pub enum CommandError {
  #[error("require bash for advanced shell syntax: <() (shell is {shell})")]
  ProcessSubstitution { shell: String },

  #[error("Failed to execute statement: {statement}")]
  Spawn {
    statement: String,
    #[source]
    source: std::io::Error,
  },

  #[error("process exited with code: {code} ({statement})")]
  ExitCode { code: i32, statement: String },

  #[error("process was terminated by signal: {signal} ({statement})")]
  Signal { signal: i32, statement: String },
}

/// Errors related to the remote object store (src/remote.rs).
#[derive(Error, Debug)]
pub enum RemoteError {
  #[error("Bucket name must be specified")]
  MissingBucket,

  #[error("Key must be specified")]
  MissingKey,

  #[error("Invalid key {key}: keys must be relative paths without `.` or `..`")]
  InvalidKey { key: String },

  #[error("Bucket not found: {bucket}")]
  BucketNotFound { bucket: String },

  #[error("Object not found: {bucket}/{key}")]
  ObjectNotFound { bucket: String, key: String },

  #[error("Path has no file name: {path}")]
  NoFileName { path: PathBuf },

  #[error("Remote store I/O failed for {path}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}
