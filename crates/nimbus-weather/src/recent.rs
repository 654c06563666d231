//! Recently searched cities, newest first.

use std::sync::Arc;

use nimbus_storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::kv::run_blocking;

pub const RECENT_SEARCHES_KEY: &str = "@weather_recent_searches";
pub const MAX_RECENT_SEARCHES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSearch {
    pub id: String,
    pub city: String,
    pub timestamp: i64,
}

/// Search history. Persistence is best-effort: storage failures are
/// logged and the in-call result is still returned.
pub struct RecentSearches {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl RecentSearches {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn list(&self) -> Vec<RecentSearch> {
        let raw = match run_blocking(&self.store, |s| s.get_item(RECENT_SEARCHES_KEY)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::error!("Error loading recent searches: {:#}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<RecentSearch>>(&raw) {
            Ok(mut searches) => {
                searches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                searches
            }
            Err(e) => {
                tracing::error!("Error loading recent searches: {}", e);
                Vec::new()
            }
        }
    }

    /// Record a search for `city`.
    ///
    /// Blank input is ignored. An earlier entry for the same city (compared
    /// case-insensitively) is replaced by the new one at the front.
    pub async fn add(&self, city: &str) -> Vec<RecentSearch> {
        let _guard = self.write_lock.lock().await;
        let mut searches = self.list().await;

        let city = city.trim();
        if city.is_empty() {
            return searches;
        }

        let now = self.clock.now_millis();
        let lowered = city.to_lowercase();
        searches.retain(|s| s.city.to_lowercase() != lowered);
        searches.insert(
            0,
            RecentSearch {
                id: format!("{}_{}", lowered, now),
                city: city.to_string(),
                timestamp: now,
            },
        );
        searches.truncate(MAX_RECENT_SEARCHES);

        self.save(&searches).await;
        searches
    }

    pub async fn remove(&self, search_id: &str) -> Vec<RecentSearch> {
        let _guard = self.write_lock.lock().await;
        let mut searches = self.list().await;
        searches.retain(|s| s.id != search_id);
        self.save(&searches).await;
        searches
    }

    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        if let Err(e) = run_blocking(&self.store, |s| s.remove_item(RECENT_SEARCHES_KEY)).await {
            tracing::error!("Error clearing recent searches: {:#}", e);
        }
    }

    async fn save(&self, searches: &[RecentSearch]) {
        let json = match serde_json::to_string(searches) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Error saving recent searches: {}", e);
                return;
            }
        };

        if let Err(e) =
            run_blocking(&self.store, move |s| s.set_item(RECENT_SEARCHES_KEY, &json)).await
        {
            tracing::error!("Error saving recent searches: {:#}", e);
        }
    }
}
