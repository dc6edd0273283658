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
use crate::error::StreamError;
use crate::stream::OpenMode;
use crate::stream::OutputStream;
use crate::stream::open_writer;
use std::path::PathBuf;

/// The placeholder replaced by the section name.
pub const SECTION_PLACEHOLDER: &str = "%s";

/// Resolved path meaning "write to the configured standard output".
pub const STDOUT_SENTINEL: &str = "-";

/// Substitutes every `%s` in `pattern` with `section`.
pub fn resolve_output_path(pattern: &str, section: &str) -> String {
  pattern.replace(SECTION_PLACEHOLDER, section)
}

/// Output filename pattern and overwrite policy (`-P` / `-F`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
  pub pattern: String,
  pub force: bool,
}

impl Default for OutputOptions {
  fn default() -> Self {
    Self {
      pattern: SECTION_PLACEHOLDER.to_string(),
      force: false,
    }
  }
}

impl OutputOptions {
  pub fn path_for(&self, section: &str) -> String {
    resolve_output_path(&self.pattern, section)
  }

  /// Opens the output file for `section`.
  ///
  /// Returns `stdout` when the resolved path is `-`. Existing files are only
  /// replaced when `force` is set; missing parent directories are created.
  pub fn open(
    &self,
    section: &str,
    mode: OpenMode,
    stdout: &OutputStream,
  ) -> Result<OutputStream, StreamError> {
    open_output(&self.pattern, section, mode, self.force, stdout)
  }
}

pub fn open_output(
  pattern: &str,
  section: &str,
  mode: OpenMode,
  force_overwrite: bool,
  stdout: &OutputStream,
) -> Result<OutputStream, StreamError> {
  let resolved = resolve_output_path(pattern, section);
  if resolved == STDOUT_SENTINEL {
    return Ok(stdout.clone());
  }

  let path = PathBuf::from(resolved);
  if !force_overwrite && path.exists() {
    return Err(StreamError::OutputExists { path });
  }

  tracing::debug!(section, path = %path.display(), "Opening output file");
  open_writer(&path, mode, true)
}
