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
use crate::config::FormatterConfig;
use crate::config::LoggingConfig;
use crate::config::Rotation;
use crate::config::SinkConfig;
use crate::config::StreamName;
use crate::error::LoggingError;
use crate::options::ParsedOptions;
use crate::options::TraceMode;
use crate::stream::OutputStream;
use crate::stream::Streams;
use chrono::Local;
use std::fmt;
use std::fmt::Write as _;
use std::io::Write as _;
use tracing::Event;
use tracing::Subscriber;
use tracing::dispatcher::DefaultGuard;
use tracing::dispatcher::Dispatch;
use tracing::field::Field;
use tracing::field::Visit;
use tracing::span::Attributes;
use tracing::span::Id;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::FormatFields;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

/// Environment variable with extra filter directives for the verbosity-based setup.
pub const LOG_FILTER_ENV: &str = "RUNRECORD_LOG";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Maps the verbosity option to a level: 0 errors only, 1 info, 2+ debug.
pub fn verbosity_level(verbosity: u8) -> LevelFilter {
  match verbosity {
    0 => LevelFilter::ERROR,
    1 => LevelFilter::INFO,
    _ => LevelFilter::DEBUG,
  }
}

/// Keeps the installed subscriber and its background writers alive.
///
/// Dropping it flushes file handlers and removes a thread-scoped subscriber.
#[must_use = "dropping the guard flushes and detaches the log handlers"]
pub struct LoggingGuard {
  _workers: Vec<WorkerGuard>,
  _scoped: Option<DefaultGuard>,
}

impl fmt::Debug for LoggingGuard {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("LoggingGuard")
      .field("workers", &self._workers.len())
      .field("scoped", &self._scoped.is_some())
      .finish()
  }
}

/// Installs the tracing subscriber for an experiment.
///
/// A loaded logging configuration replaces the verbosity-based setup
/// entirely. The subscriber becomes the global default; if one is already
/// installed, it is installed for the current thread only.
pub fn setup_tracing(options: &ParsedOptions) -> Result<LoggingGuard, LoggingError> {
  let streams = &options.streams;
  let mut workers = Vec::new();

  let mut layers: Vec<BoxedLayer> = match &options.log_config {
    Some(path) => {
      let config = LoggingConfig::load(path)?;
      config_layers(&config, streams, &mut workers)?
    }
    None => vec![verbosity_layer(options.verbosity, streams)],
  };

  if options.tracing == Some(TraceMode::Function) {
    layers.push(
      CallTracer::new(streams.stdout.clone())
        .with_filter(LevelFilter::TRACE)
        .boxed(),
    );
  }

  let dispatch = Dispatch::new(tracing_subscriber::registry().with(layers));
  let scoped = match tracing::dispatcher::set_global_default(dispatch.clone()) {
    Ok(()) => None,
    Err(_) => Some(tracing::dispatcher::set_default(&dispatch)),
  };

  Ok(LoggingGuard {
    _workers: workers,
    _scoped: scoped,
  })
}

fn verbosity_layer(verbosity: u8, streams: &Streams) -> BoxedLayer {
  let filter = EnvFilter::builder()
    .with_default_directive(verbosity_level(verbosity).into())
    .with_env_var(LOG_FILTER_ENV)
    .from_env_lossy();

  let prefix = if streams.stdlog.shares_sink_with(&streams.stdout) {
    "# "
  } else {
    ""
  };

  let stdlog = streams.stdlog.clone();
  tracing_subscriber::fmt::layer()
    .with_writer(move || stdlog.clone())
    .event_format(MultiLineFormat::with_prefix(prefix))
    .with_filter(filter)
    .boxed()
}

fn config_layers(
  config: &LoggingConfig,
  streams: &Streams,
  workers: &mut Vec<WorkerGuard>,
) -> Result<Vec<BoxedLayer>, LoggingError> {
  let mut layers = Vec::new();

  for (name, handler) in &config.handlers {
    let Some(directives) = config.directives_for(name)? else {
      tracing::debug!(handler = %name, "Handler not attached to any logger. Skipping.");
      continue;
    };

    let filter = EnvFilter::builder()
      .parse(&directives)
      .map_err(|source| LoggingError::Directives {
        directives: directives.clone(),
        source,
      })?;

    let format = match &handler.formatter {
      Some(formatter) => config
        .formatters
        .get(formatter)
        .map(MultiLineFormat::from)
        .ok_or_else(|| LoggingError::UnknownFormatter {
          handler: name.clone(),
          formatter: formatter.clone(),
        })?,
      None => MultiLineFormat::default(),
    };

    let layer = match &handler.sink {
      SinkConfig::Stream { stream } => {
        let target = match stream {
          StreamName::Stdout => streams.stdout.clone(),
          StreamName::Stderr => streams.stderr.clone(),
          StreamName::Log => streams.stdlog.clone(),
        };
        tracing_subscriber::fmt::layer()
          .with_writer(move || target.clone())
          .event_format(format)
          .with_filter(filter)
          .boxed()
      }
      SinkConfig::File { filename, rotation } => {
        let file_name = filename
          .file_name()
          .ok_or_else(|| LoggingError::LogFileName {
            path: filename.clone(),
          })?;
        let directory = filename
          .parent()
          .filter(|dir| !dir.as_os_str().is_empty())
          .unwrap_or_else(|| std::path::Path::new("."));

        let appender = match rotation {
          Rotation::Never => rolling::never(directory, file_name),
          Rotation::Minutely => rolling::minutely(directory, file_name),
          Rotation::Hourly => rolling::hourly(directory, file_name),
          Rotation::Daily => rolling::daily(directory, file_name),
        };
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(appender);
        workers.push(guard);

        tracing_subscriber::fmt::layer()
          .with_writer(non_blocking_writer)
          .event_format(format)
          .with_filter(filter)
          .boxed()
      }
    };

    layers.push(layer);
  }

  Ok(layers)
}

/// Event format `<prefix><timestamp> <LEVEL> <message>`.
///
/// Continuation lines of multi-line messages end the previous line with
/// ` \` and are indented to the message column. When the record starts with
/// `#`, continuation lines start with `#` too, keeping log lines that are
/// mixed into data output commented out.
#[derive(Debug, Clone)]
pub struct MultiLineFormat {
  prefix: String,
  timestamp: bool,
  level: bool,
  target: bool,
}

impl Default for MultiLineFormat {
  fn default() -> Self {
    Self {
      prefix: String::new(),
      timestamp: true,
      level: true,
      target: false,
    }
  }
}

impl From<&FormatterConfig> for MultiLineFormat {
  fn from(config: &FormatterConfig) -> Self {
    Self {
      prefix: config.prefix.clone(),
      timestamp: config.timestamp,
      level: config.level,
      target: config.target,
    }
  }
}

impl MultiLineFormat {
  pub fn with_prefix(prefix: &str) -> Self {
    Self {
      prefix: prefix.to_string(),
      ..Self::default()
    }
  }

  fn header(&self, event: &Event<'_>) -> String {
    let mut header = self.prefix.clone();
    if self.timestamp {
      let _ = write!(header, "{} ", Local::now().format("%Y-%m-%d %H:%M:%S,%3f"));
    }
    if self.level {
      let _ = write!(header, "{} ", event.metadata().level());
    }
    if self.target {
      let _ = write!(header, "{}: ", event.metadata().target());
    }
    header
  }
}

/// Joins `header` and `message`, continuing extra message lines under the header.
pub fn continue_lines(header: &str, message: &str) -> String {
  let record = format!("{header}{message}");
  let comment = if record.starts_with('#') { "#" } else { "" };
  let indent = " ".repeat(header.chars().count().saturating_sub(1));
  record.replace('\n', &format!(" \\\n{comment}{indent}"))
}

impl<S, N> FormatEvent<S, N> for MultiLineFormat
where
  S: Subscriber + for<'a> LookupSpan<'a>,
  N: for<'a> FormatFields<'a> + 'static,
{
  fn format_event(
    &self,
    _ctx: &FmtContext<'_, S, N>,
    mut writer: Writer<'_>,
    event: &Event<'_>,
  ) -> fmt::Result {
    let mut visitor = MessageVisitor::default();
    event.record(&mut visitor);
    writeln!(
      writer,
      "{}",
      continue_lines(&self.header(event), &visitor.finish())
    )
  }
}

/// Collects the `message` field and renders other fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
  message: String,
  fields: Vec<String>,
}

impl MessageVisitor {
  fn finish(self) -> String {
    if self.fields.is_empty() {
      self.message
    } else if self.message.is_empty() {
      self.fields.join(" ")
    } else {
      format!("{} {}", self.message, self.fields.join(" "))
    }
  }
}

impl Visit for MessageVisitor {
  fn record_str(&mut self, field: &Field, value: &str) {
    if field.name() == "message" {
      self.message = value.to_string();
    } else {
      self.fields.push(format!("{}={}", field.name(), value));
    }
  }

  fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
    if field.name() == "message" {
      self.message = format!("{value:?}");
    } else {
      self.fields.push(format!("{}={:?}", field.name(), value));
    }
  }
}

/// Prints one line per span creation, naming the span, its source location
/// and the location of the enclosing span.
///
/// Spans come from `#[tracing::instrument]` functions, so this traces calls of
/// instrumented code. It is a debugging aid and costly on hot paths.
pub struct CallTracer {
  out: OutputStream,
}

impl CallTracer {
  pub fn new(out: OutputStream) -> Self {
    Self { out }
  }
}

impl<S> Layer<S> for CallTracer
where
  S: Subscriber + for<'a> LookupSpan<'a>,
{
  fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, ctx: Context<'_, S>) {
    let meta = attrs.metadata();
    let parent = if let Some(parent) = attrs.parent() {
      ctx.span(parent)
    } else if attrs.is_contextual() {
      ctx.lookup_current()
    } else {
      None
    };

    let from = match parent {
      Some(span) => {
        let meta = span.metadata();
        format!("{}:{}", meta.file().unwrap_or("?"), meta.line().unwrap_or(0))
      }
      None => "None".to_string(),
    };

    let mut out = self.out.clone();
    let _ = writeln!(
      out,
      "# called: {}:{} ({}) (from {})",
      meta.name(),
      meta.line().unwrap_or(0),
      meta.file().unwrap_or("?"),
      from
    );
  }
}
