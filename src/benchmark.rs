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
use crate::error::HarnessError;
use crate::identity::ResourceUsage;
use crate::identity::RunIdentity;
use crate::identity::asctime;
use crate::stream::OutputStream;
use chrono::Local;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

/// Column names of the timing file.
pub const TIMING_HEADER: [&str; 14] = [
  "name", "wall", "user", "sys", "cuser", "csys", "host", "system", "release", "machine", "start",
  "end", "path", "cmd",
];

/// Accumulated wall-clock time per timed callable, keyed `name:line`.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkTable {
  entries: Arc<Mutex<BTreeMap<String, Duration>>>,
}

impl BenchmarkTable {
  pub fn add(&self, key: &str, elapsed: Duration) {
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    *entries.entry(key.to_string()).or_default() += elapsed;
  }

  pub fn get(&self, key: &str) -> Option<Duration> {
    self
      .entries
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .get(key)
      .copied()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
  }

  pub fn snapshot(&self) -> BTreeMap<String, Duration> {
    self.entries.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }

  /// The bordered summary block: seconds per key and share of `total`.
  pub fn render_summary(&self, total: Duration) -> String {
    let total = total.as_secs_f64();
    let mut summary = String::from("######### Time spent in benchmarked functions #########\n");
    summary.push_str("# function\tseconds\tpercent\n");
    for (key, elapsed) in self.snapshot() {
      let seconds = elapsed.as_secs_f64();
      let percent = if total > 0.0 {
        100.0 * seconds / total
      } else {
        0.0
      };
      summary.push_str(&format!("# {key}\t{seconds:6.2}\t{percent:5.2}%\n"));
    }
    summary.push_str("#######################################################\n");
    summary
  }
}

/// Times callables into a [`BenchmarkTable`] and reports each call on the log stream.
#[derive(Debug, Clone)]
pub struct Benchmark {
  table: BenchmarkTable,
  log: OutputStream,
}

impl Benchmark {
  pub fn new(log: OutputStream) -> Self {
    Self {
      table: BenchmarkTable::default(),
      log,
    }
  }

  pub fn table(&self) -> &BenchmarkTable {
    &self.table
  }

  /// Adds `elapsed` under `key` and writes the per-call notice.
  pub fn record(&self, key: &str, elapsed: Duration) {
    self.table.add(key, elapsed);
    let mut log = self.log.clone();
    let written = writeln!(
      log,
      "## benchmark: {key} completed in {:6.4} s",
      elapsed.as_secs_f64()
    )
    .and_then(|()| log.flush());
    if let Err(err) = written {
      tracing::warn!(key, error = %err, "Failed to write benchmark notice");
    }
  }

  /// Runs `func` once and records its wall time under `key`.
  pub fn time<R>(&self, key: &str, func: impl FnOnce() -> R) -> R {
    let started = Instant::now();
    let result = func();
    self.record(key, started.elapsed());
    result
  }

  /// Wraps `func` so every call is timed under `name:<line of this call>`.
  #[track_caller]
  pub fn wrap<F>(&self, name: &str, func: F) -> Timed<F> {
    let location = Location::caller();
    Timed {
      key: format!("{}:{}", name, location.line()),
      func,
      benchmark: self.clone(),
    }
  }
}

/// A callable whose calls are timed into a [`Benchmark`].
///
/// Arguments and results pass through untouched; a panic in the wrapped
/// callable propagates and its time is not recorded.
#[derive(Debug, Clone)]
pub struct Timed<F> {
  key: String,
  func: F,
  benchmark: Benchmark,
}

impl<F> Timed<F> {
  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn call<A, R>(&self, args: A) -> R
  where
    F: Fn(A) -> R,
  {
    self.benchmark.time(&self.key, || (self.func)(args))
  }

  pub fn call_mut<A, R>(&mut self, args: A) -> R
  where
    F: FnMut(A) -> R,
  {
    let started = Instant::now();
    let result = (self.func)(args);
    self.benchmark.record(&self.key, started.elapsed());
    result
  }
}

/// One row of the shared timing file.
#[derive(Debug, Clone)]
pub struct TimingRecord {
  pub name: String,
  pub wall: Duration,
  pub usage: ResourceUsage,
  pub host: String,
  pub system: String,
  pub release: String,
  pub machine: String,
  pub start: String,
  pub end: String,
  pub path: String,
  pub cmd: String,
}

impl TimingRecord {
  /// Builds the record for a run ending now.
  pub fn capture(name: &str, identity: &RunIdentity, cmd: &str) -> Self {
    let system = identity.system();
    Self {
      name: name.to_string(),
      wall: identity.elapsed(),
      usage: ResourceUsage::current(),
      host: system.host.clone(),
      system: system.system.clone(),
      release: system.release.clone(),
      machine: system.machine.clone(),
      start: asctime(identity.started_at()),
      end: asctime(&Local::now()),
      path: std::env::current_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_default(),
      cmd: cmd.to_string(),
    }
  }

  pub fn to_row(&self) -> String {
    let [user, sys, cuser, csys] = self.usage.formatted();
    [
      self.name.clone(),
      format!("{:5.2}", self.wall.as_secs_f64()),
      user,
      sys,
      cuser,
      csys,
      self.host.clone(),
      self.system.clone(),
      self.release.clone(),
      self.machine.clone(),
      self.start.clone(),
      self.end.clone(),
      self.path.clone(),
      self.cmd.clone(),
    ]
    .join("\t")
  }
}

/// Appends `record` to the timing file at `path`, preceded by the header row if asked.
pub fn append_timing_record(
  path: &Path,
  header: bool,
  record: &TimingRecord,
) -> Result<(), HarnessError> {
  let timing_err = |source| HarnessError::TimingFile {
    path: path.to_path_buf(),
    source,
  };

  let mut file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .map_err(timing_err)?;

  let mut text = String::new();
  if header {
    text.push_str(&TIMING_HEADER.join("\t"));
    text.push('\n');
  }
  text.push_str(&record.to_row());
  text.push('\n');

  file.write_all(text.as_bytes()).map_err(timing_err)?;
  tracing::debug!(path = %path.display(), "Timing record appended");
  Ok(())
}
