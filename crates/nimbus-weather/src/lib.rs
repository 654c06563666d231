//! Weather lookup for Nimbus.
//!
//! Fetches city weather from a remote endpoint and keeps serving it when
//! the network is gone, backed by a durable one-hour cache. Also holds the
//! user's favorites and recent searches.

pub mod cache;
pub mod clock;
pub mod connectivity;
pub mod error;
pub mod favorites;
mod kv;
pub mod provider;
pub mod recent;
pub mod resolver;
pub mod search;
pub mod service;
pub mod types;

pub use cache::{CacheEntry, CacheStore, CACHE_EXPIRATION_MS, CACHE_PREFIX};
pub use clock::{Clock, ManualClock, SystemClock};
pub use connectivity::{
    ConnectivityOracle, HttpReachability, ResolvedReachability, StaticConnectivity,
};
pub use error::{FetchError, SearchError, WeatherError};
pub use favorites::FavoritesStore;
pub use provider::WeatherApiClient;
pub use recent::{RecentSearch, RecentSearches, MAX_RECENT_SEARCHES};
pub use resolver::{BaseUrlResolver, ProbingBaseUrl, StaticBaseUrl};
pub use search::{CitySearch, SearchOutcome};
pub use service::{city_cache_key, WeatherFetchService, ALL_WEATHER_KEY};
pub use types::{normalize_city_name, DataSource, Fetched, WeatherRecord};
