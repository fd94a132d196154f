//! In-memory storage with an optional byte quota.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::Mutex;

use crate::persistence::storage::{CartStorage, StorageError};

/// Storage that keeps values in memory.
///
/// With a quota, a write fails when the combined size of keys and values would
/// exceed it, the way browser local storage does.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<FxHashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Unbounded storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage holding at most `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            values: Mutex::default(),
            quota: Some(quota),
        }
    }

    /// Byte limit, if any.
    #[must_use]
    pub fn quota(&self) -> Option<usize> {
        self.quota
    }

    /// Bytes currently used.
    pub async fn used(&self) -> usize {
        let values = self.values.lock().await;

        used_bytes(&values)
    }
}

fn used_bytes(values: &FxHashMap<String, String>) -> usize {
    values
        .iter()
        .map(|(key, value)| key.len().saturating_add(value.len()))
        .fold(0, usize::saturating_add)
}

#[async_trait]
impl CartStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut values = self.values.lock().await;

        if let Some(quota) = self.quota {
            let replaced = values
                .get(key)
                .map_or(0, |previous| key.len().saturating_add(previous.len()));
            let used = used_bytes(&values).saturating_sub(replaced);
            let needed = key.len().saturating_add(value.len());
            let available = quota.saturating_sub(used);

            if needed > available {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }

        values.insert(key.to_string(), value);

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().await.remove(key);

        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self.values.lock().await.keys().cloned().collect();

        keys.sort();

        Ok(keys)
    }
}
