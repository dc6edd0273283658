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

//! Memoization helpers.
//!
//! Arguments are keyed through [`CacheArgs`]. A type reporting no key (such
//! as a `Vec`, which is mutable) is never cached: the call always runs.

use std::cell::OnceCell;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Turns call arguments into a cache key.
pub trait CacheArgs {
  type Key: Hash + Eq;

  /// The key for these arguments, or `None` if they cannot be cached.
  fn cache_key(&self) -> Option<Self::Key>;
}

macro_rules! hashable {
  ($($ty:ty),* $(,)?) => {
    $(
      impl CacheArgs for $ty {
        type Key = $ty;

        fn cache_key(&self) -> Option<Self::Key> {
          Some(self.clone())
        }
      }
    )*
  };
}

hashable!(
  (),
  bool,
  char,
  i8,
  i16,
  i32,
  i64,
  i128,
  isize,
  u8,
  u16,
  u32,
  u64,
  u128,
  usize,
  String,
  std::path::PathBuf,
);

impl CacheArgs for str {
  type Key = String;

  fn cache_key(&self) -> Option<Self::Key> {
    Some(self.to_owned())
  }
}

impl CacheArgs for f64 {
  type Key = u64;

  fn cache_key(&self) -> Option<Self::Key> {
    Some(self.to_bits())
  }
}

impl CacheArgs for f32 {
  type Key = u32;

  fn cache_key(&self) -> Option<Self::Key> {
    Some(self.to_bits())
  }
}

impl<T: CacheArgs + ?Sized> CacheArgs for &T {
  type Key = T::Key;

  fn cache_key(&self) -> Option<Self::Key> {
    (**self).cache_key()
  }
}

impl<T: CacheArgs> CacheArgs for Option<T> {
  type Key = Option<T::Key>;

  fn cache_key(&self) -> Option<Self::Key> {
    match self {
      Some(value) => value.cache_key().map(Some),
      None => Some(None),
    }
  }
}

/// Slices and arrays are keyed element-wise.
impl<T: CacheArgs> CacheArgs for [T] {
  type Key = Vec<T::Key>;

  fn cache_key(&self) -> Option<Self::Key> {
    self.iter().map(CacheArgs::cache_key).collect()
  }
}

impl<T: CacheArgs, const N: usize> CacheArgs for [T; N] {
  type Key = Vec<T::Key>;

  fn cache_key(&self) -> Option<Self::Key> {
    self.as_slice().cache_key()
  }
}

/// Vectors are mutable sequences and never cached.
impl<T> CacheArgs for Vec<T> {
  type Key = ();

  fn cache_key(&self) -> Option<Self::Key> {
    None
  }
}

impl<K, V, S> CacheArgs for HashMap<K, V, S> {
  type Key = ();

  fn cache_key(&self) -> Option<Self::Key> {
    None
  }
}

/// An ordered map is a frozen view of keyword arguments.
impl<V: CacheArgs> CacheArgs for BTreeMap<String, V> {
  type Key = Vec<(String, V::Key)>;

  fn cache_key(&self) -> Option<Self::Key> {
    self
      .iter()
      .map(|(name, value)| value.cache_key().map(|key| (name.clone(), key)))
      .collect()
  }
}

macro_rules! tuple_args {
  ($($name:ident . $idx:tt),+) => {
    impl<$($name: CacheArgs),+> CacheArgs for ($($name,)+) {
      type Key = ($($name::Key,)+);

      fn cache_key(&self) -> Option<Self::Key> {
        Some(($(self.$idx.cache_key()?,)+))
      }
    }
  };
}

tuple_args!(A.0);
tuple_args!(A.0, B.1);
tuple_args!(A.0, B.1, C.2);
tuple_args!(A.0, B.1, C.2, D.3);
tuple_args!(A.0, B.1, C.2, D.3, E.4);
tuple_args!(A.0, B.1, C.2, D.3, E.4, F.5);

/// A function whose results are memoized by argument.
///
/// ```
/// use runrecord::cache::CachedFunction;
///
/// let area = CachedFunction::new(|(w, h): (u32, u32)| w * h);
/// assert_eq!(area.call((3, 4)), 12);
/// assert_eq!(area.len(), 1);
/// ```
pub struct CachedFunction<A: CacheArgs, R, F> {
  func: F,
  cache: RefCell<HashMap<A::Key, R>>,
  _args: PhantomData<fn(A)>,
}

impl<A, R, F> CachedFunction<A, R, F>
where
  A: CacheArgs,
  R: Clone,
  F: Fn(A) -> R,
{
  pub fn new(func: F) -> Self {
    Self {
      func,
      cache: RefCell::new(HashMap::new()),
      _args: PhantomData,
    }
  }

  /// Returns the stored result for `args`, computing and storing it on a miss.
  pub fn call(&self, args: A) -> R {
    let Some(key) = args.cache_key() else {
      return (self.func)(args);
    };

    if let Some(value) = self.cache.borrow().get(&key) {
      return value.clone();
    }

    let value = (self.func)(args);
    self.cache.borrow_mut().insert(key, value.clone());
    value
  }

  /// Evicts the entry for `args`, returning it if present.
  pub fn delete(&self, args: &A) -> Option<R> {
    let key = args.cache_key()?;
    self.cache.borrow_mut().remove(&key)
  }

  pub fn len(&self) -> usize {
    self.cache.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.cache.borrow().is_empty()
  }
}

impl<A: CacheArgs, R, F> fmt::Debug for CachedFunction<A, R, F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CachedFunction")
      .field("entries", &self.cache.borrow().len())
      .finish_non_exhaustive()
  }
}

/// Per-instance memo table for methods.
///
/// Embed one in a struct; entries are keyed by method name and arguments,
/// so each instance caches independently.
///
/// ```
/// use runrecord::cache::MethodCache;
///
/// struct Genome {
///   sequence: String,
///   cache: MethodCache<(char,), usize>,
/// }
///
/// impl Genome {
///   fn count(&self, base: char) -> usize {
///     self.cache.get_or_compute("count", (base,), |(base,)| {
///       self.sequence.chars().filter(|c| *c == base).count()
///     })
///   }
/// }
///
/// let genome = Genome { sequence: "GATTACA".into(), cache: MethodCache::default() };
/// assert_eq!(genome.count('A'), 3);
/// ```
pub struct MethodCache<A: CacheArgs, R> {
  entries: RefCell<HashMap<(&'static str, A::Key), R>>,
}

impl<A: CacheArgs, R> Default for MethodCache<A, R> {
  fn default() -> Self {
    Self {
      entries: RefCell::new(HashMap::new()),
    }
  }
}

impl<A: CacheArgs, R: Clone> MethodCache<A, R> {
  pub fn get_or_compute(&self, method: &'static str, args: A, compute: impl FnOnce(A) -> R) -> R {
    let Some(key) = args.cache_key() else {
      return compute(args);
    };
    let key = (method, key);

    if let Some(value) = self.entries.borrow().get(&key) {
      return value.clone();
    }

    let value = compute(args);
    self.entries.borrow_mut().insert(key, value.clone());
    value
  }

  pub fn delete(&self, method: &'static str, args: &A) -> Option<R> {
    let key = (method, args.cache_key()?);
    self.entries.borrow_mut().remove(&key)
  }

  pub fn len(&self) -> usize {
    self.entries.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.borrow().is_empty()
  }
}

impl<A: CacheArgs, R> fmt::Debug for MethodCache<A, R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("MethodCache")
      .field("entries", &self.entries.borrow().len())
      .finish()
  }
}

/// A read-only computed attribute: evaluated on first access, then fixed.
#[derive(Debug, Default)]
pub struct CachedProperty<T> {
  value: OnceCell<T>,
}

impl<T> CachedProperty<T> {
  pub fn new() -> Self {
    Self {
      value: OnceCell::new(),
    }
  }

  pub fn get_or_init(&self, compute: impl FnOnce() -> T) -> &T {
    self.value.get_or_init(compute)
  }

  pub fn get(&self) -> Option<&T> {
    self.value.get()
  }
}
