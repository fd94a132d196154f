//! Cart Persistence
//!
//! Best-effort durable storage of carts, one document per owner. Saving never fails
//! the caller: quota errors trigger eviction of the least recently touched carts
//! and a single retry, and anything else is logged and dropped.

use std::sync::Arc;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cart::OwnerContext;

pub mod files;
pub mod memory;
pub mod records;
pub mod scheduler;
pub mod storage;

pub use files::FileStorage;
pub use memory::MemoryStorage;
pub use records::{StoredBreakdown, StoredCartLine};
pub use scheduler::SaveScheduler;
pub use storage::{CartStorage, StorageError};

const KEY_PREFIX: &str = "cart:";

/// Document stored under each owner's key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEnvelope {
    /// When the cart was last written
    pub touched_at: Timestamp,

    /// Stored lines
    pub lines: Vec<StoredCartLine>,
}

/// Result of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written on the first attempt.
    Saved,

    /// Written after evicting other carts.
    SavedAfterEviction {
        /// Keys that were removed to make room
        evicted: Vec<String>,
    },

    /// Not written; the cart lives in memory only.
    Dropped,
}

/// Saves and loads carts keyed by owner.
#[derive(Clone)]
pub struct CartPersistence {
    storage: Arc<dyn CartStorage>,
    eviction_batch: usize,
}

impl std::fmt::Debug for CartPersistence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartPersistence")
            .field("eviction_batch", &self.eviction_batch)
            .finish_non_exhaustive()
    }
}

impl CartPersistence {
    /// Persistence over `storage`, evicting `eviction_batch` carts when full.
    #[must_use]
    pub fn new(storage: Arc<dyn CartStorage>, eviction_batch: usize) -> Self {
        Self {
            storage,
            eviction_batch: eviction_batch.max(1),
        }
    }

    /// Save `lines` under `owner`'s key.
    pub async fn save(&self, lines: &[StoredCartLine], owner: OwnerContext) -> SaveOutcome {
        let key = owner.storage_key();
        let envelope = CartEnvelope {
            touched_at: Timestamp::now(),
            lines: lines.to_vec(),
        };

        let value = match serde_json::to_string(&envelope) {
            Ok(value) => value,
            Err(err) => {
                warn!(%owner, error = %err, "could not serialize cart; not saved");

                return SaveOutcome::Dropped;
            }
        };

        match self.storage.put(&key, value.clone()).await {
            Ok(()) => {
                debug!(%owner, lines = lines.len(), "cart saved");

                SaveOutcome::Saved
            }
            Err(err) if err.is_quota() => self.evict_and_retry(&key, value, owner).await,
            Err(err) => {
                warn!(%owner, error = %err, "cart save failed; keeping cart in memory only");

                SaveOutcome::Dropped
            }
        }
    }

    /// Stored lines for `owner`; empty when nothing usable is stored.
    pub async fn load_raw(&self, owner: OwnerContext) -> Vec<StoredCartLine> {
        let key = owner.storage_key();

        let value = match self.storage.get(&key).await {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(%owner, error = %err, "could not read stored cart");

                return Vec::new();
            }
        };

        match serde_json::from_str::<CartEnvelope>(&value) {
            Ok(envelope) => envelope.lines,
            Err(err) => {
                warn!(%owner, error = %err, "discarding unreadable stored cart");

                Vec::new()
            }
        }
    }

    /// Remove `owner`'s stored cart.
    pub async fn clear(&self, owner: OwnerContext) {
        if let Err(err) = self.storage.remove(&owner.storage_key()).await {
            warn!(%owner, error = %err, "could not clear stored cart");
        }
    }

    async fn evict_and_retry(&self, key: &str, value: String, owner: OwnerContext) -> SaveOutcome {
        let evicted = match self.evict(key).await {
            Ok(evicted) => evicted,
            Err(err) => {
                warn!(%owner, error = %err, "eviction failed; cart not saved");

                return SaveOutcome::Dropped;
            }
        };

        if evicted.is_empty() {
            warn!(%owner, "storage full and nothing to evict; cart not saved");

            return SaveOutcome::Dropped;
        }

        info!(%owner, ?evicted, "evicted stored carts to make room");

        match self.storage.put(key, value).await {
            Ok(()) => SaveOutcome::SavedAfterEviction { evicted },
            Err(err) => {
                warn!(%owner, error = %err, "cart save failed after eviction");

                SaveOutcome::Dropped
            }
        }
    }

    /// Remove the least recently touched carts other than `keep`.
    async fn evict(&self, keep: &str) -> Result<Vec<String>, StorageError> {
        let mut candidates = Vec::new();

        for key in self.storage.keys().await? {
            if key == keep || !key.starts_with(KEY_PREFIX) {
                continue;
            }

            let touched_at = self
                .storage
                .get(&key)
                .await?
                .and_then(|value| serde_json::from_str::<CartEnvelope>(&value).ok())
                .map_or(Timestamp::MIN, |envelope| envelope.touched_at);

            candidates.push((touched_at, key));
        }

        candidates.sort();

        let mut evicted = Vec::new();

        for (_, key) in candidates.into_iter().take(self.eviction_batch) {
            self.storage.remove(&key).await?;
            evicted.push(key);
        }

        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use jiff::ToSpan;
    use testresult::TestResult;

    use crate::{
        cart::PurchaseMode,
        ids::{LineUuid, ProductUuid, UserUuid},
        persistence::storage::MockCartStorage,
    };

    use super::*;

    fn stored_line(quantity: u32) -> StoredCartLine {
        StoredCartLine {
            id: LineUuid::now_v7(),
            product: ProductUuid::now_v7(),
            mode: PurchaseMode::Piece,
            color: None,
            quantity,
            breakdown: StoredBreakdown {
                currency: "INR".to_string(),
                total_price: i64::from(quantity) * 330,
                original_price: i64::from(quantity) * 360,
                total_pieces: quantity,
            },
            added_at: Timestamp::UNIX_EPOCH,
            validated_at: None,
            priced_quantities: Vec::new(),
        }
    }

    fn envelope(touched_at: Timestamp) -> Result<String, serde_json::Error> {
        serde_json::to_string(&CartEnvelope {
            touched_at,
            lines: vec![stored_line(1)],
        })
    }

    #[tokio::test]
    async fn save_then_load_round_trips() -> TestResult {
        let persistence = CartPersistence::new(Arc::new(MemoryStorage::new()), 1);
        let owner = OwnerContext::User {
            user: UserUuid::now_v7(),
        };
        let lines = vec![stored_line(2), stored_line(3)];

        assert_eq!(persistence.save(&lines, owner).await, SaveOutcome::Saved);
        assert_eq!(persistence.load_raw(owner).await, lines);
        assert!(persistence.load_raw(OwnerContext::Anonymous).await.is_empty());

        persistence.clear(owner).await;

        assert!(persistence.load_raw(owner).await.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn corrupt_documents_load_as_empty() -> TestResult {
        let storage = Arc::new(MemoryStorage::new());

        storage.put("cart:anonymous", "{not json".to_string()).await?;

        let persistence = CartPersistence::new(storage, 1);

        assert!(persistence.load_raw(OwnerContext::Anonymous).await.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn quota_failure_evicts_oldest_other_cart() -> TestResult {
        let now = Timestamp::now();
        let stored = [
            ("cart:user:old", envelope(now.checked_sub(2.hours())?)?),
            ("cart:user:recent", envelope(now.checked_sub(1.minute())?)?),
            ("session:token", "keep".to_string()),
        ];

        let used: usize = stored.iter().map(|(key, value)| key.len() + value.len()).sum();
        let storage = Arc::new(MemoryStorage::with_quota(used + 100));

        for (key, value) in stored {
            storage.put(key, value).await?;
        }

        let persistence = CartPersistence::new(storage.clone(), 1);

        let outcome = persistence
            .save(&[stored_line(1)], OwnerContext::Anonymous)
            .await;

        assert_eq!(
            outcome,
            SaveOutcome::SavedAfterEviction {
                evicted: vec!["cart:user:old".to_string()],
            }
        );
        assert_eq!(
            storage.keys().await?,
            vec![
                "cart:anonymous".to_string(),
                "cart:user:recent".to_string(),
                "session:token".to_string(),
            ]
        );

        Ok(())
    }

    #[tokio::test]
    async fn save_is_dropped_when_retry_fails() {
        let mut storage = MockCartStorage::new();

        storage.expect_put().times(2).returning(|key, _| {
            Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                needed: 100,
                available: 0,
            })
        });
        storage
            .expect_keys()
            .returning(|| Ok(vec!["cart:user:stale".to_string()]));
        storage.expect_get().returning(|_| Ok(None));
        storage.expect_remove().times(1).returning(|_| Ok(()));

        let persistence = CartPersistence::new(Arc::new(storage), 1);

        assert_eq!(
            persistence.save(&[stored_line(1)], OwnerContext::Anonymous).await,
            SaveOutcome::Dropped
        );
    }

    #[tokio::test]
    async fn non_quota_failures_are_dropped_without_eviction() {
        let mut storage = MockCartStorage::new();

        storage
            .expect_put()
            .times(1)
            .returning(|_, _| Err(StorageError::Unavailable("disk detached".to_string())));
        storage.expect_keys().never();

        let persistence = CartPersistence::new(Arc::new(storage), 1);

        assert_eq!(
            persistence.save(&[stored_line(1)], OwnerContext::Anonymous).await,
            SaveOutcome::Dropped
        );
    }
}
