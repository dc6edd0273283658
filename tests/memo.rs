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
use runrecord::cache::CacheArgs;
use runrecord::cache::CachedFunction;
use runrecord::cache::CachedProperty;
use runrecord::cache::MethodCache;
use runrecord::counter::Counter;
use runrecord::counter::TableLayout;
use std::cell::Cell;
use std::collections::BTreeMap;

#[test]
fn test_cached_function_computes_once() {
  let calls = Cell::new(0);
  let area = CachedFunction::new(|(w, h): (u32, u32)| {
    calls.set(calls.get() + 1);
    w * h
  });

  assert_eq!(area.call((3, 4)), 12);
  assert_eq!(area.call((3, 4)), 12);
  assert_eq!(calls.get(), 1);

  assert_eq!(area.call((4, 3)), 12);
  assert_eq!(calls.get(), 2);
  assert_eq!(area.len(), 2);
}

#[test]
fn test_cached_function_bypasses_vec_arguments() {
  let calls = Cell::new(0);
  let total = CachedFunction::new(|values: Vec<i32>| {
    calls.set(calls.get() + 1);
    values.iter().sum::<i32>()
  });

  assert_eq!(total.call(vec![1, 2, 3]), 6);
  assert_eq!(total.call(vec![1, 2, 3]), 6);
  assert_eq!(calls.get(), 2);
  assert!(total.is_empty());
}

#[test]
fn test_cached_function_delete() {
  let calls = Cell::new(0);
  let greet = CachedFunction::new(|name: String| {
    calls.set(calls.get() + 1);
    format!("hello {name}")
  });

  greet.call("ann".to_string());
  assert_eq!(greet.delete(&"ann".to_string()).as_deref(), Some("hello ann"));
  assert_eq!(greet.delete(&"ann".to_string()), None);

  greet.call("ann".to_string());
  assert_eq!(calls.get(), 2);
}

#[test]
fn test_cache_keys() {
  assert_eq!(2.5f64.cache_key(), Some(2.5f64.to_bits()));
  assert_eq!(Some(3u8).cache_key(), Some(Some(3u8)));
  assert_eq!(vec![1].cache_key(), None);
  assert_eq!((1, vec![2]).cache_key(), None);
  assert_eq!([1, 2].cache_key(), Some(vec![1, 2]));

  let mut kwargs = BTreeMap::new();
  kwargs.insert("b".to_string(), 2);
  kwargs.insert("a".to_string(), 1);
  assert_eq!(
    kwargs.cache_key(),
    Some(vec![("a".to_string(), 1), ("b".to_string(), 2)])
  );
}

struct Sequence {
  bases: String,
  calls: Cell<usize>,
  cache: MethodCache<(char,), usize>,
  gc: CachedProperty<f64>,
}

impl Sequence {
  fn new(bases: &str) -> Self {
    Self {
      bases: bases.to_string(),
      calls: Cell::new(0),
      cache: MethodCache::default(),
      gc: CachedProperty::new(),
    }
  }

  fn count(&self, base: char) -> usize {
    self.cache.get_or_compute("count", (base,), |(base,)| {
      self.calls.set(self.calls.get() + 1);
      self.bases.chars().filter(|c| *c == base).count()
    })
  }

  fn gc_content(&self) -> f64 {
    *self.gc.get_or_init(|| {
      self.calls.set(self.calls.get() + 1);
      (self.count('G') + self.count('C')) as f64 / self.bases.len() as f64
    })
  }
}

#[test]
fn test_method_cache_is_per_instance() {
  let first = Sequence::new("GATTACA");
  let second = Sequence::new("GGG");

  assert_eq!(first.count('G'), 1);
  assert_eq!(first.count('G'), 1);
  assert_eq!(second.count('G'), 3);
  assert_eq!(first.calls.get(), 1);
  assert_eq!(second.calls.get(), 1);

  assert_eq!(first.cache.delete("count", &('G',)), Some(1));
  assert_eq!(first.count('G'), 1);
  assert_eq!(first.calls.get(), 2);
}

#[test]
fn test_cached_property_computes_once() {
  let sequence = Sequence::new("GCAT");
  assert!(sequence.gc.get().is_none());

  assert_eq!(sequence.gc_content(), 0.5);
  let calls = sequence.calls.get();
  assert_eq!(sequence.gc_content(), 0.5);
  assert_eq!(sequence.calls.get(), calls);
}

#[test]
fn test_counter_defaults_and_increments() {
  let mut counter = Counter::new();
  assert_eq!(counter["missing"], 0);
  assert_eq!(counter.get("missing"), 0);
  assert!(counter.is_empty());

  counter["hits"] += 1;
  counter.incr("hits");
  counter.add("bytes", 512);
  counter.set("errors", 0);
  assert_eq!(counter["hits"], 2);
  assert_eq!(counter.len(), 3);
  assert_eq!(counter.to_string(), "bytes=512, errors=0, hits=2");
}

#[test]
fn test_counter_merge() {
  let mut total: Counter = [("b", 3), ("c", 4)].into_iter().collect();
  let other: Counter = [("a", 1), ("b", 2)].into_iter().collect();

  total += &other;
  assert_eq!(
    total.iter().collect::<Vec<_>>(),
    [("a", 1), ("b", 5), ("c", 4)]
  );

  total += other;
  assert_eq!(total["b"], 7);
}

#[test]
fn test_counter_tables() {
  let counter: Counter = [("zeta", 1), ("alpha", 2)].into_iter().collect();
  assert_eq!(counter.as_table(TableLayout::Rows), "alpha\t2\nzeta\t1");
  assert_eq!(counter.as_table(TableLayout::Columns), "alpha\tzeta\n2\t1");
  assert_eq!(Counter::new().as_table(TableLayout::Rows), "");
  assert_eq!(Counter::new().as_table(TableLayout::Columns), "");
}
