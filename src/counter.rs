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
use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;
use std::ops::Index;
use std::ops::IndexMut;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
  /// One `key\tvalue` row per key.
  Rows,
  /// A row of keys followed by a row of values.
  Columns,
}

/// Counts keyed by name. Missing keys read as 0.
///
/// ```
/// use runrecord::counter::Counter;
///
/// let mut counts = Counter::new();
/// counts["input"] += 1;
/// counts["skipped"] += 2;
/// assert_eq!(counts["output"], 0);
/// assert_eq!(counts.to_string(), "input=1, skipped=2");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counter {
  counts: BTreeMap<String, i64>,
}

impl Counter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, key: &str) -> i64 {
    self.counts.get(key).copied().unwrap_or(0)
  }

  pub fn incr(&mut self, key: &str) {
    self.add(key, 1);
  }

  pub fn add(&mut self, key: &str, amount: i64) {
    self[key] += amount;
  }

  pub fn set(&mut self, key: &str, value: i64) {
    self.counts.insert(key.to_string(), value);
  }

  pub fn len(&self) -> usize {
    self.counts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.counts.is_empty()
  }

  /// Entries in key order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
    self.counts.iter().map(|(key, value)| (key.as_str(), *value))
  }

  /// Tab-separated table, keys sorted lexicographically, no trailing newline.
  pub fn as_table(&self, layout: TableLayout) -> String {
    if self.counts.is_empty() {
      return String::new();
    }

    match layout {
      TableLayout::Rows => self
        .iter()
        .map(|(key, value)| format!("{key}\t{value}"))
        .collect::<Vec<_>>()
        .join("\n"),
      TableLayout::Columns => {
        let keys = self.counts.keys().cloned().collect::<Vec<_>>();
        let values = self
          .counts
          .values()
          .map(i64::to_string)
          .collect::<Vec<_>>();
        format!("{}\n{}", keys.join("\t"), values.join("\t"))
      }
    }
  }
}

impl Index<&str> for Counter {
  type Output = i64;

  fn index(&self, key: &str) -> &i64 {
    self.counts.get(key).unwrap_or(&0)
  }
}

impl IndexMut<&str> for Counter {
  fn index_mut(&mut self, key: &str) -> &mut i64 {
    self.counts.entry(key.to_string()).or_insert(0)
  }
}

impl AddAssign<&Counter> for Counter {
  fn add_assign(&mut self, other: &Counter) {
    for (key, value) in other.iter() {
      self[key] += value;
    }
  }
}

impl AddAssign for Counter {
  fn add_assign(&mut self, other: Counter) {
    *self += &other;
  }
}

impl fmt::Display for Counter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let rendered = self
      .iter()
      .map(|(key, value)| format!("{key}={value}"))
      .collect::<Vec<_>>()
      .join(", ");
    f.write_str(&rendered)
  }
}

impl<K: Into<String>> FromIterator<(K, i64)> for Counter {
  fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
    let mut counter = Counter::new();
    counter.extend(iter);
    counter
  }
}

impl<K: Into<String>> Extend<(K, i64)> for Counter {
  fn extend<I: IntoIterator<Item = (K, i64)>>(&mut self, iter: I) {
    for (key, value) in iter {
      *self.counts.entry(key.into()).or_insert(0) += value;
    }
  }
}
