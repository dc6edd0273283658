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
use crate::error::LoggingError;
use figment::Figment;
use figment::providers::Env;
use figment::providers::Format;
use figment::providers::Json;
use figment::providers::Toml;
use figment::providers::Yaml;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Prefix of environment variables overriding logging configuration values.
pub const LOG_ENV_PREFIX: &str = "RUNRECORD_LOG_";

/// Declarative logging configuration, loaded from YAML, TOML or JSON.
///
/// ```yaml
/// version: 1
/// formatters:
///   plain:
///     prefix: "# "
/// handlers:
///   console:
///     class: stream
///     stream: log
///     formatter: plain
///   file:
///     class: file
///     filename: logs/run.log
///     level: debug
/// loggers:
///   runrecord:
///     level: info
/// root:
///   level: warning
///   handlers: [console, file]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  #[serde(default = "default_version")]
  pub version: u32,
  #[serde(default)]
  pub formatters: BTreeMap<String, FormatterConfig>,
  #[serde(default)]
  pub handlers: BTreeMap<String, HandlerConfig>,
  #[serde(default)]
  pub loggers: BTreeMap<String, LoggerConfig>,
  #[serde(default)]
  pub root: Option<LoggerConfig>,
}

fn default_version() -> u32 {
  1
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormatterConfig {
  /// Text written before every record, e.g. `"# "`.
  #[serde(default)]
  pub prefix: String,
  #[serde(default = "default_true")]
  pub timestamp: bool,
  #[serde(default = "default_true")]
  pub level: bool,
  #[serde(default)]
  pub target: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandlerConfig {
  #[serde(flatten)]
  pub sink: SinkConfig,
  #[serde(default)]
  pub level: Option<String>,
  #[serde(default)]
  pub formatter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "class", rename_all = "lowercase")]
pub enum SinkConfig {
  Stream {
    #[serde(default)]
    stream: StreamName,
  },
  File {
    filename: PathBuf,
    #[serde(default)]
    rotation: Rotation,
  },
}

/// Which of the experiment's resolved streams a stream handler writes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamName {
  Stdout,
  Stderr,
  #[default]
  Log,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
  #[default]
  Never,
  Minutely,
  Hourly,
  Daily,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggerConfig {
  #[serde(default)]
  pub level: Option<String>,
  #[serde(default)]
  pub handlers: Vec<String>,
}

impl LoggingConfig {
  /// Loads the file at `path`, picking the format from its extension
  /// (`.toml`, `.json`, anything else is YAML). Values can be overridden
  /// with `RUNRECORD_LOG_*` variables, nested keys separated by `__`.
  pub fn load(path: &Path) -> Result<Self, LoggingError> {
    if !path.exists() {
      return Err(LoggingError::MissingConfig {
        path: path.to_path_buf(),
      });
    }

    let figment = match path.extension().and_then(|ext| ext.to_str()) {
      Some("toml") => Figment::from(Toml::file(path)),
      Some("json") => Figment::from(Json::file(path)),
      _ => Figment::from(Yaml::file(path)),
    };

    let config: LoggingConfig = figment
      .merge(Env::prefixed(LOG_ENV_PREFIX).split("__"))
      .extract()
      .map_err(|source| LoggingError::ParseConfig {
        path: path.to_path_buf(),
        source: Box::new(source),
      })?;

    config.validate()?;
    Ok(config)
  }

  /// Checks that every handler and formatter reference resolves.
  pub fn validate(&self) -> Result<(), LoggingError> {
    let named = self
      .root
      .iter()
      .map(|root| ("root", root))
      .chain(
        self
          .loggers
          .iter()
          .map(|(name, logger)| (name.as_str(), logger)),
      );

    for (logger, config) in named {
      if let Some(level) = &config.level {
        parse_level(level)?;
      }
      for handler in &config.handlers {
        if !self.handlers.contains_key(handler) {
          return Err(LoggingError::UnknownHandler {
            logger: logger.to_string(),
            handler: handler.clone(),
          });
        }
      }
    }

    for (name, handler) in &self.handlers {
      if let Some(level) = &handler.level {
        parse_level(level)?;
      }
      if let Some(formatter) = &handler.formatter {
        if !self.formatters.contains_key(formatter) {
          return Err(LoggingError::UnknownFormatter {
            handler: name.clone(),
            formatter: formatter.clone(),
          });
        }
      }
    }

    Ok(())
  }

  /// Filter directives for the named handler, or `None` if no logger uses it.
  ///
  /// Each logger level is capped by the handler level. Handlers attached to
  /// the root receive every logger's records; others only their own.
  pub fn directives_for(&self, handler: &str) -> Result<Option<String>, LoggingError> {
    let handler_level = match self.handlers.get(handler).and_then(|h| h.level.as_deref()) {
      Some(level) => parse_level(level)?,
      None => LevelFilter::TRACE,
    };

    let root = self.root.clone().unwrap_or_default();
    let on_root = root.handlers.iter().any(|name| name == handler);
    let root_level = match root.level.as_deref() {
      Some(level) => parse_level(level)?,
      None => LevelFilter::WARN,
    };

    let mut directives = Vec::new();
    let default_level = if on_root { root_level } else { LevelFilter::OFF };
    directives.push(default_level.min(handler_level).to_string());

    let mut used = on_root;
    for (target, logger) in &self.loggers {
      let attached = logger.handlers.iter().any(|name| name == handler);
      if !(on_root || attached) {
        continue;
      }
      used = true;
      match logger.level.as_deref() {
        Some(level) => {
          let level = parse_level(level)?.min(handler_level);
          directives.push(format!("{target}={level}"));
        }
        // Off the root the default directive is `off`, so spell out the
        // inherited level.
        None if !on_root => {
          let level = self.inherited_level(target, root_level)?.min(handler_level);
          directives.push(format!("{target}={level}"));
        }
        None => {}
      }
    }

    Ok(used.then(|| directives.join(",")))
  }

  /// Level of the nearest `::` ancestor of `target` that sets one, else `root_level`.
  fn inherited_level(
    &self,
    target: &str,
    root_level: LevelFilter,
  ) -> Result<LevelFilter, LoggingError> {
    let mut current = target;
    while let Some((parent, _)) = current.rsplit_once("::") {
      if let Some(level) = self.loggers.get(parent).and_then(|l| l.level.as_deref()) {
        return parse_level(level);
      }
      current = parent;
    }
    Ok(root_level)
  }
}

/// Parses a level name. `critical`, `warning` and `notset` are accepted as aliases.
pub fn parse_level(name: &str) -> Result<LevelFilter, LoggingError> {
  match name.to_ascii_lowercase().as_str() {
    "critical" | "fatal" | "error" => Ok(LevelFilter::ERROR),
    "warning" | "warn" => Ok(LevelFilter::WARN),
    "info" => Ok(LevelFilter::INFO),
    "debug" => Ok(LevelFilter::DEBUG),
    "trace" | "notset" => Ok(LevelFilter::TRACE),
    "off" => Ok(LevelFilter::OFF),
    _ => Err(LoggingError::InvalidLevel {
      level: name.to_string(),
    }),
  }
}
