//! User's favorite cities, persisted as full record snapshots.

use std::sync::Arc;

use anyhow::{Context, Result};
use nimbus_storage::KeyValueStore;
use tokio::sync::Mutex;

use crate::kv::run_blocking;
use crate::types::WeatherRecord;

pub const FAVORITES_KEY: &str = "@weather_app_favorites";

pub struct FavoritesStore {
    store: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FavoritesStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// All favorites in the order they were added.
    ///
    /// A corrupt stored list reads as empty.
    pub async fn list(&self) -> Result<Vec<WeatherRecord>> {
        let raw = run_blocking(&self.store, |s| s.get_item(FAVORITES_KEY))
            .await
            .context("Failed to load favorites")?;

        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(favorites) => Ok(favorites),
            Err(e) => {
                tracing::error!("Error loading favorites: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Add a city. Returns `false` if a record with the same id is
    /// already a favorite.
    pub async fn add(&self, record: WeatherRecord) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut favorites = self.list().await?;

        if favorites.iter().any(|f| f.id == record.id) {
            return Ok(false);
        }

        tracing::info!("Adding {} to favorites", record.city);
        favorites.push(record);
        self.save(&favorites).await?;
        Ok(true)
    }

    /// Remove a city by id. Returns `false` if it wasn't a favorite.
    pub async fn remove(&self, city_id: i64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut favorites = self.list().await?;

        let before = favorites.len();
        favorites.retain(|f| f.id != city_id);
        if favorites.len() == before {
            return Ok(false);
        }

        self.save(&favorites).await?;
        Ok(true)
    }

    pub async fn is_favorite(&self, city_id: i64) -> Result<bool> {
        Ok(self.list().await?.iter().any(|f| f.id == city_id))
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        run_blocking(&self.store, |s| s.remove_item(FAVORITES_KEY))
            .await
            .context("Failed to clear favorites")
    }

    async fn save(&self, favorites: &[WeatherRecord]) -> Result<()> {
        let json = serde_json::to_string(favorites)?;
        run_blocking(&self.store, move |s| s.set_item(FAVORITES_KEY, &json))
            .await
            .context("Failed to save favorites")
    }
}
