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
use flate2::Compression as GzLevel;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fmt;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// On-disk encoding of a stream, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
  Plain,
  Gzip,
}

impl Compression {
  /// `.gz` and `.z` (any case) select gzip, everything else is plain.
  pub fn from_path(path: &Path) -> Self {
    match path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(str::to_ascii_lowercase)
      .as_deref()
    {
      Some("gz") | Some("z") => Compression::Gzip,
      _ => Compression::Plain,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
  Read,
  Write,
  Append,
}

/// Where a stream reads from or writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSource {
  Stdin,
  Stdout,
  Stderr,
  File(PathBuf),
}

impl StreamSource {
  pub fn is_standard(&self) -> bool {
    !matches!(self, StreamSource::File(_))
  }
}

impl fmt::Display for StreamSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StreamSource::Stdin => f.write_str("<stdin>"),
      StreamSource::Stdout => f.write_str("<stdout>"),
      StreamSource::Stderr => f.write_str("<stderr>"),
      StreamSource::File(path) => write!(f, "{}", path.display()),
    }
  }
}

/// A readable stream: standard input, a plain file or a gzip file.
pub struct InputStream {
  source: StreamSource,
  reader: Box<dyn BufRead>,
}

impl InputStream {
  pub fn stdin() -> Self {
    Self {
      source: StreamSource::Stdin,
      reader: Box::new(BufReader::new(io::stdin())),
    }
  }

  pub fn source(&self) -> &StreamSource {
    &self.source
  }
}

impl fmt::Debug for InputStream {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("InputStream")
      .field("source", &self.source)
      .finish_non_exhaustive()
  }
}

impl Read for InputStream {
  fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
    self.reader.read(buf)
  }
}

impl BufRead for InputStream {
  fn fill_buf(&mut self) -> io::Result<&[u8]> {
    self.reader.fill_buf()
  }

  fn consume(&mut self, amt: usize) {
    self.reader.consume(amt)
  }
}

enum Sink {
  Stdout,
  Stderr,
  Plain(BufWriter<File>),
  Gzip(GzEncoder<BufWriter<File>>),
  Closed,
}

impl Write for Sink {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    match self {
      Sink::Stdout => io::stdout().write(buf),
      Sink::Stderr => io::stderr().write(buf),
      Sink::Plain(writer) => writer.write(buf),
      Sink::Gzip(writer) => writer.write(buf),
      Sink::Closed => Err(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "write to closed stream",
      )),
    }
  }

  fn flush(&mut self) -> io::Result<()> {
    match self {
      Sink::Stdout => io::stdout().flush(),
      Sink::Stderr => io::stderr().flush(),
      Sink::Plain(writer) => writer.flush(),
      Sink::Gzip(writer) => writer.flush(),
      Sink::Closed => Ok(()),
    }
  }
}

/// A writable stream shared between the caller, the logger and the harness.
///
/// Clones write to the same underlying sink, so the log layer and the
/// caller can hold handles to one redirected file.
#[derive(Clone)]
pub struct OutputStream {
  source: StreamSource,
  sink: Arc<Mutex<Sink>>,
}

impl OutputStream {
  pub fn stdout() -> Self {
    Self::from_sink(StreamSource::Stdout, Sink::Stdout)
  }

  pub fn stderr() -> Self {
    Self::from_sink(StreamSource::Stderr, Sink::Stderr)
  }

  fn from_sink(source: StreamSource, sink: Sink) -> Self {
    Self {
      source,
      sink: Arc::new(Mutex::new(sink)),
    }
  }

  pub fn source(&self) -> &StreamSource {
    &self.source
  }

  /// True if both handles write through the same sink.
  pub fn shares_sink_with(&self, other: &OutputStream) -> bool {
    Arc::ptr_eq(&self.sink, &other.sink)
  }

  fn lock(&self) -> MutexGuard<'_, Sink> {
    self.sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Flushes and closes the sink, writing the gzip trailer if needed.
  ///
  /// Standard streams are flushed but stay open. Other clones of this
  /// handle fail on write afterwards.
  pub fn close(&self) -> Result<(), StreamError> {
    let close_err = |source| StreamError::Close {
      name: self.source.to_string(),
      source,
    };

    let mut sink = self.lock();
    match std::mem::replace(&mut *sink, Sink::Closed) {
      Sink::Stdout => {
        *sink = Sink::Stdout;
        io::stdout().flush().map_err(close_err)
      }
      Sink::Stderr => {
        *sink = Sink::Stderr;
        io::stderr().flush().map_err(close_err)
      }
      Sink::Plain(mut writer) => writer.flush().map_err(close_err),
      Sink::Gzip(encoder) => encoder
        .finish()
        .and_then(|mut writer| writer.flush())
        .map_err(close_err),
      Sink::Closed => Ok(()),
    }
  }
}

impl fmt::Debug for OutputStream {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OutputStream")
      .field("source", &self.source)
      .finish_non_exhaustive()
  }
}

impl Write for OutputStream {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.lock().write(buf)
  }

  fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
    self.lock().write_all(buf)
  }

  fn flush(&mut self) -> io::Result<()> {
    self.lock().flush()
  }
}

/// Either half of [`open_stream`].
#[derive(Debug)]
pub enum Stream {
  Input(InputStream),
  Output(OutputStream),
}

/// Opens `path` for reading, truncating or appending.
///
/// Gzip compression is selected by [`Compression::from_path`]. With
/// `create_parent_dir`, a missing parent directory is created first.
pub fn open_stream(
  path: impl AsRef<Path>,
  mode: OpenMode,
  create_parent_dir: bool,
) -> Result<Stream, StreamError> {
  let path = path.as_ref();
  if create_parent_dir {
    create_parent(path)?;
  }

  match mode {
    OpenMode::Read => open_reader(path).map(Stream::Input),
    OpenMode::Write | OpenMode::Append => {
      open_file_writer(path, mode == OpenMode::Append).map(Stream::Output)
    }
  }
}

pub fn open_reader(path: impl AsRef<Path>) -> Result<InputStream, StreamError> {
  let path = path.as_ref();
  let file = File::open(path).map_err(|source| StreamError::Open {
    path: path.to_path_buf(),
    source,
  })?;

  let reader: Box<dyn BufRead> = match Compression::from_path(path) {
    Compression::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
    Compression::Plain => Box::new(BufReader::new(file)),
  };

  Ok(InputStream {
    source: StreamSource::File(path.to_path_buf()),
    reader,
  })
}

pub fn open_writer(
  path: impl AsRef<Path>,
  mode: OpenMode,
  create_parent_dir: bool,
) -> Result<OutputStream, StreamError> {
  let path = path.as_ref();
  if mode == OpenMode::Read {
    return Err(StreamError::Open {
      path: path.to_path_buf(),
      source: io::Error::new(io::ErrorKind::InvalidInput, "writer requested in read mode"),
    });
  }
  if create_parent_dir {
    create_parent(path)?;
  }
  open_file_writer(path, mode == OpenMode::Append)
}

fn open_file_writer(path: &Path, append: bool) -> Result<OutputStream, StreamError> {
  let file = OpenOptions::new()
    .write(true)
    .create(true)
    .append(append)
    .truncate(!append)
    .open(path)
    .map_err(|source| StreamError::Open {
      path: path.to_path_buf(),
      source,
    })?;

  let writer = BufWriter::new(file);
  let sink = match Compression::from_path(path) {
    Compression::Gzip => Sink::Gzip(GzEncoder::new(writer, GzLevel::default())),
    Compression::Plain => Sink::Plain(writer),
  };

  Ok(OutputStream::from_sink(
    StreamSource::File(path.to_path_buf()),
    sink,
  ))
}

fn create_parent(path: &Path) -> Result<(), StreamError> {
  match path.parent() {
    Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
      fs::create_dir_all(dir).map_err(|source| StreamError::CreateDir {
        path: dir.to_path_buf(),
        source,
      })
    }
    _ => Ok(()),
  }
}

/// The four resolved standard streams of an experiment.
#[derive(Debug)]
pub struct Streams {
  pub stdin: InputStream,
  pub stdout: OutputStream,
  pub stderr: OutputStream,
  pub stdlog: OutputStream,
}

impl Streams {
  /// The real standard streams; the log goes to standard output.
  pub fn standard() -> Self {
    let stdout = OutputStream::stdout();
    Self {
      stdin: InputStream::stdin(),
      stdlog: stdout.clone(),
      stdout,
      stderr: OutputStream::stderr(),
    }
  }

  /// Opens the redirection targets that were given.
  ///
  /// A missing path or `-` keeps the standard stream. The log is opened in
  /// append mode and shares the stdout handle when not redirected.
  pub fn resolve(paths: &PipePaths) -> Result<Self, StreamError> {
    let real_stdout = OutputStream::stdout();

    let stdout = match redirected(&paths.stdout) {
      Some(path) => open_writer(path, OpenMode::Write, false)?,
      None => real_stdout.clone(),
    };
    let stderr = match redirected(&paths.stderr) {
      Some(path) => open_writer(path, OpenMode::Write, false)?,
      None => OutputStream::stderr(),
    };
    let stdlog = match redirected(&paths.stdlog) {
      Some(path) => open_writer(path, OpenMode::Append, false)?,
      None => real_stdout,
    };
    let stdin = match redirected(&paths.stdin) {
      Some(path) => open_reader(path)?,
      None => InputStream::stdin(),
    };

    Ok(Self {
      stdin,
      stdout,
      stderr,
      stdlog,
    })
  }
}

fn redirected(path: &Option<PathBuf>) -> Option<&Path> {
  path
    .as_deref()
    .filter(|path| path.as_os_str() != "-")
}

/// Redirection paths as given on the command line (`-I`, `-S`, `-E`, `-L`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipePaths {
  pub stdin: Option<PathBuf>,
  pub stdout: Option<PathBuf>,
  pub stderr: Option<PathBuf>,
  pub stdlog: Option<PathBuf>,
}
