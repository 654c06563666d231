//! Namespaced, expiring cache over the durable key-value store.
//!
//! Entries are stored as `{"data": ..., "timestamp": <ms>}` under
//! `weather_cache_<key>`. Expiry is lazy: an entry older than
//! [`CACHE_EXPIRATION_MS`] is deleted the next time it is read, and
//! otherwise lingers until [`CacheStore::clear_cache`].
//!
//! The cache is best-effort. Write failures and unreadable entries are
//! logged and reported as misses, never as errors.

use std::sync::Arc;

use nimbus_storage::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::kv::run_blocking;

/// One hour.
pub const CACHE_EXPIRATION_MS: i64 = 60 * 60 * 1000;

/// Prefix shared by every cache key, enabling bulk clear.
pub const CACHE_PREFIX: &str = "weather_cache_";

/// Persisted form of a cached payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
}

impl<T> CacheEntry<T> {
    /// An age that can't be computed counts as expired.
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        now_millis
            .checked_sub(self.timestamp)
            .is_some_and(|age| age <= CACHE_EXPIRATION_MS)
    }
}

#[derive(Deserialize)]
struct EntryStamp {
    timestamp: i64,
}

#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn namespaced(key: &str) -> String {
        format!("{}{}", CACHE_PREFIX, key)
    }

    /// Write `data` under `key`, stamped with the current time.
    pub async fn set_cached_data<T: Serialize + ?Sized>(&self, key: &str, data: &T) {
        let entry = CacheEntry {
            data,
            timestamp: self.clock.now_millis(),
        };
        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Error caching data for {}: {}", key, e);
                return;
            }
        };

        let full_key = Self::namespaced(key);
        match run_blocking(&self.store, move |s| s.set_item(&full_key, &json)).await {
            Ok(()) => tracing::debug!("Cached {}", key),
            Err(e) => tracing::error!("Error caching data for {}: {:#}", key, e),
        }
    }

    /// Read the payload under `key` if present and unexpired.
    pub async fn get_cached_data<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read_raw(key).await?;

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Unreadable cache entry for {}: {}", key, e);
                return None;
            }
        };

        if !entry.is_valid_at(self.clock.now_millis()) {
            tracing::debug!("Cache entry for {} expired, removing", key);
            let full_key = Self::namespaced(key);
            if let Err(e) = run_blocking(&self.store, move |s| s.remove_item(&full_key)).await {
                tracing::warn!("Failed to remove expired cache entry {}: {:#}", key, e);
            }
            return None;
        }

        Some(entry.data)
    }

    /// Delete every key under the cache prefix in one batch.
    ///
    /// Returns how many entries were removed.
    pub async fn clear_cache(&self) -> usize {
        let result = run_blocking(&self.store, |s| {
            let keys: Vec<String> = s
                .all_keys()?
                .into_iter()
                .filter(|k| k.starts_with(CACHE_PREFIX))
                .collect();
            s.multi_remove(&keys)?;
            Ok(keys.len())
        })
        .await;

        match result {
            Ok(count) => {
                tracing::info!("Cleared {} cache entries", count);
                count
            }
            Err(e) => {
                tracing::error!("Error clearing cache: {:#}", e);
                0
            }
        }
    }

    /// Milliseconds since `key` was written, regardless of expiry.
    pub async fn cache_age(&self, key: &str) -> Option<i64> {
        let raw = self.read_raw(key).await?;
        match serde_json::from_str::<EntryStamp>(&raw) {
            Ok(stamp) => {
                let age = self.clock.now_millis().checked_sub(stamp.timestamp);
                if age.is_none() {
                    tracing::warn!("Cache entry for {} has an unusable timestamp", key);
                }
                age
            }
            Err(e) => {
                tracing::warn!("Error getting cache age for {}: {}", key, e);
                None
            }
        }
    }

    async fn read_raw(&self, key: &str) -> Option<String> {
        let full_key = Self::namespaced(key);
        match run_blocking(&self.store, move |s| s.get_item(&full_key)).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Error retrieving cached data for {}: {:#}", key, e);
                None
            }
        }
    }
}
