//! In-memory [`ObjectStore`] with failure injection.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;
use partlake_core::{LakeError, Result};

use crate::ObjectStore;

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    failing_copies: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.get(bucket, key).is_some()
    }

    /// Sorted keys present in `bucket`.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Copies from `source_key` will fail.
    pub fn fail_copy_of(&self, source_key: &str) {
        self.failing_copies.lock().insert(source_key.to_string());
    }

    /// Deletes of `key` will fail.
    pub fn fail_delete_of(&self, key: &str) {
        self.failing_deletes.lock().insert(key.to_string());
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn copy_object(&self, bucket: &str, source_key: &str, target_key: &str) -> Result<()> {
        if self.failing_copies.lock().contains(source_key) {
            return Err(LakeError::Copy {
                key: source_key.to_string(),
                reason: "AccessDenied: injected failure".to_string(),
            });
        }
        let body = self.get(bucket, source_key).ok_or_else(|| LakeError::Copy {
            key: source_key.to_string(),
            reason: "NoSuchKey: The specified key does not exist.".to_string(),
        })?;
        self.put(bucket, target_key, body);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        if self.failing_deletes.lock().contains(key) {
            return Err(LakeError::Delete {
                key: key.to_string(),
                reason: "AccessDenied: injected failure".to_string(),
            });
        }
        // Deleting a missing key succeeds, as in S3
        self.objects
            .lock()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}
