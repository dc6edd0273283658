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
use chrono::DateTime;
use chrono::Local;
use std::sync::OnceLock;
use std::time::Duration;
use std::time::Instant;
use uuid::Uuid;

/// Layout of `time.asctime`, e.g. `Thu Mar 29 13:06:33 2012`.
pub const ASCTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

static RUN_ID: OnceLock<Uuid> = OnceLock::new();

/// The unique id of this process. Generated on first use and stable afterwards.
pub fn run_id() -> Uuid {
  *RUN_ID.get_or_init(Uuid::new_v4)
}

/// Formats a timestamp the way the execution header and footer print it.
pub fn asctime(time: &DateTime<Local>) -> String {
  time.format(ASCTIME_FORMAT).to_string()
}

/// Operating system descriptor, as reported by `uname`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
  pub system: String,
  pub host: String,
  pub release: String,
  pub version: String,
  pub machine: String,
}

impl SystemInfo {
  #[cfg(unix)]
  pub fn current() -> Self {
    // SAFETY: `utsname` is plain old data; an all-zero value is valid and
    // `uname` only writes NUL-terminated strings into it.
    let mut raw: libc::utsname = unsafe { std::mem::zeroed() };
    if unsafe { libc::uname(&mut raw) } != 0 {
      tracing::warn!(error = %std::io::Error::last_os_error(), "uname failed");
      return Self::fallback();
    }

    Self {
      system: c_field(&raw.sysname),
      host: c_field(&raw.nodename),
      release: c_field(&raw.release),
      version: c_field(&raw.version),
      machine: c_field(&raw.machine),
    }
  }

  #[cfg(not(unix))]
  pub fn current() -> Self {
    Self::fallback()
  }

  fn fallback() -> Self {
    Self {
      system: std::env::consts::OS.to_string(),
      host: "unknown".to_string(),
      release: String::new(),
      version: String::new(),
      machine: std::env::consts::ARCH.to_string(),
    }
  }
}

#[cfg(unix)]
fn c_field(field: &[libc::c_char]) -> String {
  // SAFETY: `uname` guarantees NUL termination within the field.
  unsafe { std::ffi::CStr::from_ptr(field.as_ptr()) }
    .to_string_lossy()
    .into_owned()
}

/// CPU times of this process and its waited-for children.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceUsage {
  pub user: Duration,
  pub system: Duration,
  pub child_user: Duration,
  pub child_system: Duration,
}

impl ResourceUsage {
  #[cfg(unix)]
  pub fn current() -> Self {
    let (user, system) = rusage(libc::RUSAGE_SELF);
    let (child_user, child_system) = rusage(libc::RUSAGE_CHILDREN);
    Self {
      user,
      system,
      child_user,
      child_system,
    }
  }

  #[cfg(not(unix))]
  pub fn current() -> Self {
    Self::default()
  }

  /// The four times in seconds, formatted `%5.2f`.
  pub fn formatted(&self) -> [String; 4] {
    [self.user, self.system, self.child_user, self.child_system]
      .map(|d| format!("{:5.2}", d.as_secs_f64()))
  }
}

#[cfg(unix)]
fn rusage(who: libc::c_int) -> (Duration, Duration) {
  // SAFETY: `rusage` is plain old data and `getrusage` only fills it in.
  let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
  if unsafe { libc::getrusage(who, &mut usage) } != 0 {
    return (Duration::ZERO, Duration::ZERO);
  }
  (
    duration_from_timeval(usage.ru_utime),
    duration_from_timeval(usage.ru_stime),
  )
}

#[cfg(unix)]
fn duration_from_timeval(timeval: libc::timeval) -> Duration {
  Duration::new(timeval.tv_sec as u64, (timeval.tv_usec as u32) * 1000)
}

/// Who ran what, where and when. Captured once when an experiment starts.
#[derive(Debug, Clone)]
pub struct RunIdentity {
  run_id: Uuid,
  started_at: DateTime<Local>,
  started: Instant,
  pid: u32,
  system: SystemInfo,
}

impl RunIdentity {
  pub fn capture() -> Self {
    Self {
      run_id: run_id(),
      started_at: Local::now(),
      started: Instant::now(),
      pid: std::process::id(),
      system: SystemInfo::current(),
    }
  }

  pub fn run_id(&self) -> Uuid {
    self.run_id
  }

  pub fn started_at(&self) -> &DateTime<Local> {
    &self.started_at
  }

  /// Wall-clock time since the identity was captured.
  pub fn elapsed(&self) -> Duration {
    self.started.elapsed()
  }

  pub fn pid(&self) -> u32 {
    self.pid
  }

  pub fn system(&self) -> &SystemInfo {
    &self.system
  }
}
