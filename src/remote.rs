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
use crate::error::RemoteError;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// Access to a bucket/key object store.
pub trait ObjectStore {
  fn bucket_exists(&self, bucket: &str) -> bool;

  /// True if `key` is stored in `bucket`.
  fn exists(&self, bucket: &str, key: &str) -> Result<bool, RemoteError>;

  /// Copies the object into `dest_dir` under the key's base name and returns the new path.
  fn download(&self, bucket: &str, key: &str, dest_dir: &Path) -> Result<PathBuf, RemoteError>;

  /// Stores the file at `path` in `bucket`, keyed by its file name.
  fn upload(&self, bucket: &str, path: &Path) -> Result<String, RemoteError>;

  fn delete(&self, bucket: &str, key: &str) -> Result<(), RemoteError>;
}

/// An object store on the local file system: each bucket is a directory under `root`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
  root: PathBuf,
}

impl DirectoryStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, RemoteError> {
    if bucket.is_empty() {
      return Err(RemoteError::MissingBucket);
    }
    let dir = self.root.join(bucket);
    if !dir.is_dir() {
      return Err(RemoteError::BucketNotFound {
        bucket: bucket.to_string(),
      });
    }
    Ok(dir)
  }

  fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, RemoteError> {
    let dir = self.bucket_dir(bucket)?;
    if key.is_empty() {
      return Err(RemoteError::MissingKey);
    }
    // Keys stay inside their bucket.
    if !Path::new(key)
      .components()
      .all(|component| matches!(component, Component::Normal(_)))
    {
      return Err(RemoteError::InvalidKey {
        key: key.to_string(),
      });
    }
    Ok(dir.join(key))
  }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> RemoteError + '_ {
  move |source| RemoteError::Io {
    path: path.to_path_buf(),
    source,
  }
}

impl ObjectStore for DirectoryStore {
  fn bucket_exists(&self, bucket: &str) -> bool {
    !bucket.is_empty() && self.root.join(bucket).is_dir()
  }

  fn exists(&self, bucket: &str, key: &str) -> Result<bool, RemoteError> {
    Ok(self.object_path(bucket, key)?.is_file())
  }

  fn download(&self, bucket: &str, key: &str, dest_dir: &Path) -> Result<PathBuf, RemoteError> {
    let source = self.object_path(bucket, key)?;
    if !source.is_file() {
      return Err(RemoteError::ObjectNotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
      });
    }

    let file_name = source.file_name().ok_or_else(|| RemoteError::NoFileName {
      path: source.clone(),
    })?;
    fs::create_dir_all(dest_dir).map_err(io_err(dest_dir))?;
    let dest = dest_dir.join(file_name);
    fs::copy(&source, &dest).map_err(io_err(&dest))?;

    tracing::debug!(bucket, key, dest = %dest.display(), "Object downloaded");
    Ok(dest)
  }

  fn upload(&self, bucket: &str, path: &Path) -> Result<String, RemoteError> {
    let dir = self.bucket_dir(bucket)?;
    let key = path
      .file_name()
      .and_then(|name| name.to_str())
      .ok_or_else(|| RemoteError::NoFileName {
        path: path.to_path_buf(),
      })?
      .to_string();

    let dest = dir.join(&key);
    fs::copy(path, &dest).map_err(io_err(path))?;

    tracing::debug!(bucket, key = %key, "Object uploaded");
    Ok(key)
  }

  fn delete(&self, bucket: &str, key: &str) -> Result<(), RemoteError> {
    let path = self.object_path(bucket, key)?;
    if !path.is_file() {
      return Err(RemoteError::ObjectNotFound {
        bucket: bucket.to_string(),
        key: key.to_string(),
      });
    }
    fs::remove_file(&path).map_err(io_err(&path))
  }
}
