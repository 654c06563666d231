//! Interactive city search: fetch, then remember what was found.

use std::sync::Arc;

use crate::error::SearchError;
use crate::recent::RecentSearches;
use crate::service::WeatherFetchService;
use crate::types::{Fetched, WeatherRecord};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Fetched<WeatherRecord>),
    NotFound { query: String },
}

pub struct CitySearch {
    service: Arc<WeatherFetchService>,
    recent: Arc<RecentSearches>,
}

impl CitySearch {
    pub fn new(service: Arc<WeatherFetchService>, recent: Arc<RecentSearches>) -> Self {
        Self { service, recent }
    }

    /// Look up `query`. A hit is recorded in recent searches under the
    /// server's canonical city name.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let fetched = self.service.fetch_weather_by_city(query).await?;
        let source = fetched.source;

        match fetched.into_inner() {
            Some(record) => {
                self.recent.add(&record.city).await;
                Ok(SearchOutcome::Found(Fetched::new(record, source)))
            }
            None => Ok(SearchOutcome::NotFound {
                query: query.to_string(),
            }),
        }
    }
}
