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
use runrecord::error::RemoteError;
use runrecord::remote::DirectoryStore;
use runrecord::remote::ObjectStore;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_upload_download_delete() {
  let temp = tempdir().unwrap();
  let store = DirectoryStore::new(temp.path().join("store"));
  fs::create_dir_all(store.root().join("reads")).unwrap();

  let local = temp.path().join("sample.fastq");
  fs::write(&local, "@r1\nACGT\n").unwrap();

  assert!(store.bucket_exists("reads"));
  assert!(!store.bucket_exists("other"));

  let key = store.upload("reads", &local).unwrap();
  assert_eq!(key, "sample.fastq");
  assert!(store.exists("reads", &key).unwrap());

  let dest = temp.path().join("downloads");
  let downloaded = store.download("reads", &key, &dest).unwrap();
  assert_eq!(downloaded, dest.join("sample.fastq"));
  assert_eq!(fs::read_to_string(&downloaded).unwrap(), "@r1\nACGT\n");

  store.delete("reads", &key).unwrap();
  assert!(!store.exists("reads", &key).unwrap());
  assert!(matches!(
    store.delete("reads", &key),
    Err(RemoteError::ObjectNotFound { .. })
  ));
}

#[test]
fn test_bucket_and_key_are_required() {
  let temp = tempdir().unwrap();
  let store = DirectoryStore::new(temp.path());
  fs::create_dir(temp.path().join("bucket")).unwrap();

  assert!(matches!(
    store.download("", "key", temp.path()),
    Err(RemoteError::MissingBucket)
  ));
  assert!(matches!(
    store.download("bucket", "", temp.path()),
    Err(RemoteError::MissingKey)
  ));
  assert!(matches!(
    store.exists("missing", "key"),
    Err(RemoteError::BucketNotFound { .. })
  ));
  assert!(matches!(
    store.download("bucket", "absent.txt", temp.path()),
    Err(RemoteError::ObjectNotFound { .. })
  ));
}

#[test]
fn test_keys_cannot_leave_their_bucket() {
  let temp = tempdir().unwrap();
  let store = DirectoryStore::new(temp.path().join("store"));
  fs::create_dir_all(store.root().join("bucket").join("nested")).unwrap();
  fs::write(store.root().join("secret.txt"), "keep").unwrap();
  fs::write(store.root().join("bucket").join("nested").join("a.txt"), "a").unwrap();

  let outside = temp.path().join("outside.txt");
  fs::write(&outside, "keep").unwrap();
  let absolute = outside.to_str().unwrap();

  for key in ["../secret.txt", "nested/../../secret.txt", "./nested/a.txt", absolute] {
    assert!(matches!(
      store.delete("bucket", key),
      Err(RemoteError::InvalidKey { .. })
    ));
    assert!(matches!(
      store.exists("bucket", key),
      Err(RemoteError::InvalidKey { .. })
    ));
    assert!(matches!(
      store.download("bucket", key, temp.path()),
      Err(RemoteError::InvalidKey { .. })
    ));
  }
  assert!(store.root().join("secret.txt").exists());
  assert!(outside.exists());

  assert!(store.exists("bucket", "nested/a.txt").unwrap());
}
