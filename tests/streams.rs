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
use runrecord::error::StreamError;
use runrecord::output::OutputOptions;
use runrecord::output::open_output;
use runrecord::output::resolve_output_path;
use runrecord::stream::Compression;
use runrecord::stream::OpenMode;
use runrecord::stream::OutputStream;
use runrecord::stream::PipePaths;
use runrecord::stream::Stream;
use runrecord::stream::StreamSource;
use runrecord::stream::Streams;
use runrecord::stream::open_reader;
use runrecord::stream::open_stream;
use runrecord::stream::open_writer;
use std::fs;
use std::io::BufRead;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

#[test]
fn test_compression_from_extension() {
  assert_eq!(Compression::from_path(Path::new("a.gz")), Compression::Gzip);
  assert_eq!(Compression::from_path(Path::new("a.tsv.GZ")), Compression::Gzip);
  assert_eq!(Compression::from_path(Path::new("a.z")), Compression::Gzip);
  assert_eq!(Compression::from_path(Path::new("a.tsv")), Compression::Plain);
  assert_eq!(Compression::from_path(Path::new("gz")), Compression::Plain);
}

#[test]
fn test_gzip_stream_is_compressed_on_disk() {
  let temp = tempdir().unwrap();
  let path = temp.path().join("table.tsv.gz");
  let text = "a\tb\n1\t2\n".repeat(50);

  let Stream::Output(mut out) = open_stream(&path, OpenMode::Write, false).unwrap() else {
    panic!("expected an output stream");
  };
  out.write_all(text.as_bytes()).unwrap();
  out.close().unwrap();

  let raw = fs::read(&path).unwrap();
  assert_ne!(raw, text.as_bytes());
  assert_eq!(&raw[..2], &[0x1f, 0x8b]);

  let Stream::Input(mut input) = open_stream(&path, OpenMode::Read, false).unwrap() else {
    panic!("expected an input stream");
  };
  let mut read_back = String::new();
  input.read_to_string(&mut read_back).unwrap();
  assert_eq!(read_back, text);
}

#[test]
fn test_appended_gzip_members_read_as_one_stream() {
  let temp = tempdir().unwrap();
  let path = temp.path().join("log.gz");

  for line in ["first\n", "second\n"] {
    let mut out = open_writer(&path, OpenMode::Append, false).unwrap();
    out.write_all(line.as_bytes()).unwrap();
    out.close().unwrap();
  }

  let lines: Vec<String> = open_reader(&path)
    .unwrap()
    .lines()
    .map(Result::unwrap)
    .collect();
  assert_eq!(lines, ["first", "second"]);
}

#[test]
fn test_open_stream_creates_parent_dir() {
  let temp = tempdir().unwrap();
  let path = temp.path().join("nested").join("deeper").join("out.txt");

  assert!(open_stream(&path, OpenMode::Write, false).is_err());
  let stream = open_stream(&path, OpenMode::Write, true).unwrap();
  assert!(matches!(stream, Stream::Output(_)));
  assert!(path.exists());
}

#[test]
fn test_open_reader_missing_file_names_path() {
  let temp = tempdir().unwrap();
  let path = temp.path().join("absent.txt");

  let err = open_reader(&path).unwrap_err();
  assert!(matches!(err, StreamError::Open { path: ref p, .. } if p == &path));
}

#[test]
fn test_closed_clone_rejects_writes() {
  let temp = tempdir().unwrap();
  let path = temp.path().join("out.txt");

  let out = open_writer(&path, OpenMode::Write, false).unwrap();
  let mut other = out.clone();
  assert!(out.shares_sink_with(&other));
  other.write_all(b"kept\n").unwrap();
  out.close().unwrap();

  assert!(other.write_all(b"lost\n").is_err());
  assert_eq!(fs::read_to_string(&path).unwrap(), "kept\n");
}

#[test]
fn test_resolve_streams() {
  let temp = tempdir().unwrap();
  let input = temp.path().join("in.txt");
  let stdout = temp.path().join("out.txt");
  let stdlog = temp.path().join("run.log");
  fs::write(&input, "line\n").unwrap();
  fs::write(&stdlog, "earlier\n").unwrap();

  let mut streams = Streams::resolve(&PipePaths {
    stdin: Some(input.clone()),
    stdout: Some(stdout.clone()),
    stderr: Some("-".into()),
    stdlog: Some(stdlog.clone()),
  })
  .unwrap();

  assert_eq!(streams.stdin.source(), &StreamSource::File(input));
  assert_eq!(streams.stderr.source(), &StreamSource::Stderr);
  assert!(!streams.stdlog.shares_sink_with(&streams.stdout));

  let mut line = String::new();
  streams.stdin.read_line(&mut line).unwrap();
  assert_eq!(line, "line\n");

  streams.stdlog.write_all(b"later\n").unwrap();
  streams.stdlog.flush().unwrap();
  streams.stdout.write_all(b"data\n").unwrap();
  streams.stdout.close().unwrap();

  assert_eq!(fs::read_to_string(&stdlog).unwrap(), "earlier\nlater\n");
  assert_eq!(fs::read_to_string(&stdout).unwrap(), "data\n");
}

#[test]
fn test_standard_streams_share_log_with_stdout() {
  let streams = Streams::resolve(&PipePaths::default()).unwrap();
  assert!(streams.stdlog.shares_sink_with(&streams.stdout));
  assert_eq!(streams.stdout.source(), &StreamSource::Stdout);
  assert_eq!(streams.stdin.source(), &StreamSource::Stdin);

  let standard = Streams::standard();
  assert!(standard.stdlog.shares_sink_with(&standard.stdout));
}

#[test]
fn test_resolve_output_path() {
  assert_eq!(
    resolve_output_path("sample1_%s.tsv.gz", "histogram"),
    "sample1_histogram.tsv.gz"
  );
  assert_eq!(resolve_output_path("fixed.tsv", "histogram"), "fixed.tsv");
  assert_eq!(resolve_output_path("%s/%s.tsv", "a"), "a/a.tsv");
}

#[test]
fn test_open_output_overwrite_protection() {
  let temp = tempdir().unwrap();
  let pattern = temp.path().join("%s.tsv").display().to_string();
  let stdout = OutputStream::stdout();

  let first = open_output(&pattern, "counts", OpenMode::Write, false, &stdout).unwrap();
  first.close().unwrap();

  let err = open_output(&pattern, "counts", OpenMode::Write, false, &stdout).unwrap_err();
  assert!(matches!(err, StreamError::OutputExists { .. }));
  assert!(err.to_string().contains("--force-output"));

  let forced = open_output(&pattern, "counts", OpenMode::Write, true, &stdout).unwrap();
  forced.close().unwrap();
}

#[test]
fn test_open_output_dash_is_stdout() {
  let stdout = OutputStream::stdout();
  let out = OutputOptions::default()
    .open("-", OpenMode::Write, &stdout)
    .unwrap();
  assert!(out.shares_sink_with(&stdout));

  let options = OutputOptions {
    pattern: "-".to_string(),
    force: false,
  };
  assert_eq!(options.path_for("anything"), "-");
}
