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

//! # Runrecord
//!
//! `runrecord` gives command-line scripts a uniform experiment lifecycle.
//! A script builds its own `clap` command, hands it to
//! [`experiment::Experiment::start`], does its work and calls
//! [`experiment::Experiment::stop`]. In between, every run gets the same
//! standard options, redirectable (and transparently gzipped) streams, a
//! logger, an execution header and footer tagged with a unique run id, and an
//! optional line in a shared timing file.
//!
//! ## Core Modules
//!
//! * [`experiment`]: The `Experiment` context: start, accessors and stop.
//! * [`options`]: Adds the standard option groups to a caller's command and
//!   extracts them from the matches.
//! * [`stream`]: Opens plain or gzip files, and resolves the redirected
//!   standard streams.
//! * [`output`]: Per-section output files from a `%s` filename pattern.
//! * [`logging`] and [`config`]: The `tracing` subscriber, either from the
//!   verbosity level or from a logging configuration file.
//! * [`render`] and [`identity`]: Header, footer and parameter dump, and the
//!   run id, host and resource data they print.
//! * [`benchmark`]: Timed callables, the summary table and the timing file.
//! * [`cache`] and [`counter`]: Memoization helpers and a keyed counter.
//! * [`command`]: Runs shell statements.
//! * [`remote`]: Bucket/key object store access.
//! * [`cli`]: Arguments of the bundled `runrecord` binary.
//! * [`error`]: Defines the custom error types for the library.

pub mod benchmark;
pub mod cache;
pub mod cli;
pub mod command;
pub mod config;
pub mod counter;
pub mod error;
pub mod experiment;
pub mod identity;
pub mod logging;
pub mod options;
pub mod output;
pub mod remote;
pub mod render;
pub mod stream;
