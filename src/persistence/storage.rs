//! Key-value storage for persisted carts.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Writing the value would exceed the storage capacity.
    #[error("storing {key} needs {needed} bytes but only {available} are available")]
    QuotaExceeded {
        /// Key being written
        key: String,

        /// Bytes the write needs
        needed: usize,

        /// Bytes left
        available: usize,
    },

    /// Storage could not be read or written.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Storage is not usable at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Whether the failure was caused by running out of space.
    #[must_use]
    pub fn is_quota(&self) -> bool {
        match self {
            StorageError::QuotaExceeded { .. } => true,
            StorageError::Io(err) => err.kind() == std::io::ErrorKind::StorageFull,
            StorageError::Unavailable(_) => false,
        }
    }
}

/// Key-value store holding serialized carts.
#[automock]
#[async_trait]
pub trait CartStorage: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Every stored key.
    async fn keys(&self) -> Result<Vec<String>, StorageError>;
}
