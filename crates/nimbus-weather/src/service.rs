//! Offline-aware weather fetching.
//!
//! Every request follows the same sequence: read the cache, ask the
//! connectivity oracle, then either serve the cache (offline) or hit the
//! network. A failed network request falls back to the cache when an
//! unexpired entry exists; successful responses refresh the cache.
//! Callers can tell which path produced a result via [`DataSource`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nimbus_core::Config;
use nimbus_storage::KeyValueStore;

use crate::cache::CacheStore;
use crate::connectivity::{
    ConnectivityOracle, HttpReachability, ResolvedReachability, StaticConnectivity,
};
use crate::error::{FetchError, WeatherError};
use crate::provider::WeatherApiClient;
use crate::resolver::{BaseUrlResolver, ProbingBaseUrl, StaticBaseUrl};
use crate::types::{normalize_city_name, DataSource, Fetched, WeatherRecord};

/// Cache key for the full city list.
pub const ALL_WEATHER_KEY: &str = "all_weather";

/// Cache key for a single city, by normalized name.
pub fn city_cache_key(normalized_city: &str) -> String {
    format!("city_{}", normalized_city)
}

pub struct WeatherFetchService {
    resolver: Arc<dyn BaseUrlResolver>,
    connectivity: Arc<dyn ConnectivityOracle>,
    cache: CacheStore,
    client: WeatherApiClient,
}

impl WeatherFetchService {
    pub fn new(
        resolver: Arc<dyn BaseUrlResolver>,
        connectivity: Arc<dyn ConnectivityOracle>,
        cache: CacheStore,
        client: WeatherApiClient,
    ) -> Self {
        Self {
            resolver,
            connectivity,
            cache,
            client,
        }
    }

    /// Wire up the service from configuration.
    ///
    /// Candidate URLs, when configured, take precedence over `api.base_url`,
    /// and without an explicit `connectivity.probe_url` reachability is
    /// probed against the resolved candidate. `connectivity.force_offline`
    /// swaps the HTTP probe for a fixed "offline" answer.
    pub fn from_config(config: &Config, store: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let probe_timeout = Duration::from_millis(config.connectivity.probe_timeout_ms);

        let resolver: Arc<dyn BaseUrlResolver> = if config.api.candidate_urls.is_empty() {
            Arc::new(StaticBaseUrl::new(&config.api.base_url))
        } else {
            Arc::new(ProbingBaseUrl::new(&config.api.candidate_urls, probe_timeout)?)
        };

        let connectivity: Arc<dyn ConnectivityOracle> = if config.connectivity.force_offline {
            Arc::new(StaticConnectivity::offline())
        } else if config.connectivity.probe_url.is_none() && !config.api.candidate_urls.is_empty()
        {
            Arc::new(ResolvedReachability::new(resolver.clone(), probe_timeout)?)
        } else {
            Arc::new(HttpReachability::new(config.probe_url(), probe_timeout)?)
        };

        let client = WeatherApiClient::new(Duration::from_secs(config.api.request_timeout_secs))?;

        Ok(Self::new(resolver, connectivity, CacheStore::new(store), client))
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Drop every cached weather entry. Returns how many were removed.
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear_cache().await
    }

    /// Milliseconds since `key` was cached, if it is.
    pub async fn cache_age(&self, key: &str) -> Option<i64> {
        self.cache.cache_age(key).await
    }

    /// Current reachability, for offline banners. Independent of fetches.
    pub async fn is_connected(&self) -> bool {
        self.connectivity.is_connected().await
    }

    /// Weather for every known city.
    pub async fn fetch_weather_data(&self) -> Result<Fetched<Vec<WeatherRecord>>, WeatherError> {
        let cached: Option<Vec<WeatherRecord>> =
            self.cache.get_cached_data(ALL_WEATHER_KEY).await;

        let client = &self.client;
        let fetched = self
            .serve(ALL_WEATHER_KEY, cached, |base| async move {
                client.fetch_all(&base).await
            })
            .await?;

        if fetched.is_fresh() {
            self.cache.set_cached_data(ALL_WEATHER_KEY, &fetched.data).await;
        }

        Ok(fetched)
    }

    /// Weather for one city. `Ok(None)` means the server knows no such city.
    ///
    /// Not-found answers are not cached, so a later lookup asks the
    /// server again.
    pub async fn fetch_weather_by_city(
        &self,
        city_name: &str,
    ) -> Result<Fetched<Option<WeatherRecord>>, WeatherError> {
        let normalized = normalize_city_name(city_name);
        let key = city_cache_key(&normalized);

        let cached: Option<WeatherRecord> = self.cache.get_cached_data(&key).await;

        let client = &self.client;
        let query = normalized.as_str();
        let fetched = self
            .serve(&key, cached.map(Some), |base| async move {
                client.fetch_city(&base, query).await
            })
            .await?;

        if fetched.is_fresh() {
            match &fetched.data {
                Some(record) => self.cache.set_cached_data(&key, record).await,
                None => tracing::info!("No weather data found for {}", normalized),
            }
        }

        Ok(fetched)
    }

    async fn serve<T, F, Fut>(
        &self,
        key: &str,
        cached: Option<T>,
        fetch: F,
    ) -> Result<Fetched<T>, WeatherError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        if !self.connectivity.is_connected().await {
            return match cached {
                Some(data) => {
                    tracing::info!("Offline, serving {} from cache", key);
                    Ok(Fetched::new(data, DataSource::OfflineCache))
                }
                None => {
                    tracing::warn!("Offline with no cached data for {}", key);
                    Err(WeatherError::NoConnectivity)
                }
            };
        }

        let base_url = self.resolver.resolve_base_url().await;
        match fetch(base_url).await {
            Ok(data) => Ok(Fetched::new(data, DataSource::Network)),
            Err(e) => match cached {
                Some(data) => {
                    tracing::warn!("Fetching {} failed ({}), serving cached data", key, e);
                    Ok(Fetched::new(data, DataSource::FallbackCache))
                }
                None => {
                    tracing::error!("Fetching {} failed with no cached fallback: {}", key, e);
                    Err(WeatherError::Fetch(e))
                }
            },
        }
    }
}
