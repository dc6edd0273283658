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
use runrecord::benchmark::Benchmark;
use runrecord::benchmark::BenchmarkTable;
use runrecord::benchmark::TIMING_HEADER;
use runrecord::benchmark::TimingRecord;
use runrecord::benchmark::append_timing_record;
use runrecord::identity::RunIdentity;
use runrecord::stream::OpenMode;
use runrecord::stream::open_writer;
use std::fs;
use std::thread::sleep;
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn test_timed_calls_accumulate() {
  let temp = tempdir().unwrap();
  let log_path = temp.path().join("bench.log");
  let log = open_writer(&log_path, OpenMode::Write, false).unwrap();
  let benchmark = Benchmark::new(log.clone());

  let nap = benchmark.wrap("nap", |millis: u64| {
    sleep(Duration::from_millis(millis));
    millis * 2
  });
  let line = line!() - 4;
  assert_eq!(nap.key(), format!("nap:{line}"));

  assert_eq!(nap.call(20), 40);
  let once = benchmark.table().get(nap.key()).unwrap();
  assert!(once >= Duration::from_millis(20));

  assert_eq!(nap.call(20), 40);
  let twice = benchmark.table().get(nap.key()).unwrap();
  assert!(twice >= Duration::from_millis(40));
  assert!(twice > once);

  log.close().unwrap();
  let content = fs::read_to_string(&log_path).unwrap();
  let notices: Vec<&str> = content.lines().collect();
  assert_eq!(notices.len(), 2);
  assert!(notices[0].starts_with(&format!("## benchmark: nap:{line} completed in")));
  assert!(notices[0].ends_with(" s"));
}

#[test]
fn test_timed_mut_and_one_off() {
  let temp = tempdir().unwrap();
  let log = open_writer(temp.path().join("bench.log"), OpenMode::Write, false).unwrap();
  let benchmark = Benchmark::new(log);

  let mut seen = Vec::new();
  let mut collect = benchmark.wrap("collect", |value: i32| seen.push(value));
  collect.call_mut(1);
  collect.call_mut(2);
  let key = collect.key().to_string();
  drop(collect);
  assert_eq!(seen, [1, 2]);

  assert_eq!(benchmark.time("setup", || "ready"), "ready");
  let snapshot = benchmark.table().snapshot();
  assert!(snapshot.contains_key("setup"));
  assert!(snapshot.contains_key(&key));
}

#[test]
fn test_summary_rendering() {
  let table = BenchmarkTable::default();
  assert!(table.is_empty());
  table.add("load:10", Duration::from_millis(500));
  table.add("load:10", Duration::from_millis(500));
  table.add("sort:20", Duration::from_millis(250));

  let summary = table.render_summary(Duration::from_secs(2));
  let lines: Vec<&str> = summary.lines().collect();
  assert_eq!(lines.len(), 5);
  assert!(lines[0].contains("Time spent in benchmarked functions"));
  assert_eq!(lines[2], "# load:10\t  1.00\t50.00%");
  assert_eq!(lines[3], "# sort:20\t  0.25\t12.50%");
  assert!(lines[4].chars().all(|c| c == '#'));
}

#[test]
fn test_timing_file_rows() {
  let temp = tempdir().unwrap();
  let path = temp.path().join("timings.tsv");
  let identity = RunIdentity::capture();

  let record = TimingRecord::capture("align", &identity, "prog");
  append_timing_record(&path, true, &record).unwrap();
  append_timing_record(&path, false, &record).unwrap();

  let content = fs::read_to_string(&path).unwrap();
  let lines: Vec<&str> = content.lines().collect();
  assert_eq!(lines.len(), 3);
  assert_eq!(lines[0], TIMING_HEADER.join("\t"));

  let fields: Vec<&str> = lines[1].split('\t').collect();
  assert_eq!(fields.len(), TIMING_HEADER.len());
  assert_eq!(fields[0], "align");
  assert_eq!(fields[6], identity.system().host);
  assert_eq!(fields[13], "prog");
}
