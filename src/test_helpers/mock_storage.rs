//! Mock store implementation for testing

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::storage::{ArtifactStore, StorageError, StorageResult, StoredObject};

struct MockObject {
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// In-memory store with a controllable clock and injectable failures
pub struct MockStore {
    objects: Mutex<BTreeMap<String, MockObject>>,
    clock: Mutex<DateTime<Utc>>,
    failing_deletes: Mutex<HashSet<String>>,
    fail_uploads: Mutex<bool>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            clock: Mutex::new(Utc::now()),
            failing_deletes: Mutex::new(HashSet::new()),
            fail_uploads: Mutex::new(false),
        }
    }

    /// Set the time stamped on subsequent uploads
    pub fn set_clock(&self, now: DateTime<Utc>) {
        *self.clock.lock().unwrap() = now;
    }

    /// Insert an object directly
    pub fn insert(&self, key: &str, data: &[u8], last_modified: DateTime<Utc>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            MockObject {
                data: data.to_vec(),
                last_modified,
            },
        );
    }

    /// Make `delete(key)` fail
    pub fn fail_delete_of(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }

    /// Make every upload fail
    pub fn fail_uploads(&self, fail: bool) {
        *self.fail_uploads.lock().unwrap() = fail;
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn has(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn data(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|o| o.data.clone())
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactStore for MockStore {
    fn list(&self, prefix: &str) -> StorageResult<Vec<StoredObject>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| StoredObject {
                key: key.clone(),
                last_modified: object.last_modified,
                size: object.data.len() as u64,
            })
            .collect())
    }

    fn put_file(&self, key: &str, path: &Path) -> StorageResult<u64> {
        if *self.fail_uploads.lock().unwrap() {
            return Err(StorageError::UploadFailed(format!("injected failure for {}", key)));
        }
        let data = std::fs::read(path)?;
        let size = data.len() as u64;
        let now = *self.clock.lock().unwrap();
        self.insert(key, &data, now);
        Ok(size)
    }

    fn get_to_file(&self, key: &str, path: &Path) -> StorageResult<u64> {
        let data = self
            .data(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        std::fs::write(path, &data)?;
        Ok(data.len() as u64)
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        if self.failing_deletes.lock().unwrap().contains(key) {
            return Err(StorageError::DeleteFailed(format!("injected failure for {}", key)));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        let data = self
            .data(from)
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        let now = *self.clock.lock().unwrap();
        self.insert(to, &data, now);
        Ok(())
    }

    fn location(&self) -> String {
        "mock://".to_string()
    }
}
