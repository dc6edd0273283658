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
use crate::identity::ResourceUsage;
use crate::identity::RunIdentity;
use crate::identity::asctime;
use chrono::Local;
use std::collections::BTreeMap;

/// Renders the execution header: command line, start time, host, run id, pid and OS.
///
/// ```text
/// output generated by prog --verbose=2
/// job started at Thu Mar 29 13:06:33 2012 on host -- e1c16e80-03a1-4023-9417-f3e44e33bdcd
/// pid: 16649, system: Linux 6.1.0 #1 SMP x86_64
/// ```
pub fn render_header(identity: &RunIdentity, argv: &[String]) -> String {
  let system = identity.system();
  format!(
    "output generated by {}\njob started at {} on {} -- {}\npid: {}, system: {} {} {} {}",
    argv.join(" "),
    asctime(identity.started_at()),
    system.host,
    identity.run_id(),
    identity.pid(),
    system.system,
    system.release,
    system.version,
    system.machine,
  )
}

/// Renders the execution footer: elapsed seconds, completion time, CPU times and run id.
pub fn render_footer(identity: &RunIdentity, usage: &ResourceUsage) -> String {
  format!(
    "job finished in {} seconds at {} -- {} -- {}",
    identity.elapsed().as_secs(),
    asctime(&Local::now()),
    usage.formatted().join(" "),
    identity.run_id(),
  )
}

/// Renders one `name: value` line per parameter, sorted by name.
pub fn render_params(params: &BTreeMap<String, String>) -> String {
  if params.is_empty() {
    return "# no parameters.".to_string();
  }

  params
    .iter()
    .map(|(name, value)| format!("{name:<40}: {value}"))
    .collect::<Vec<_>>()
    .join("\n")
}
