//! HTTP client for the weather endpoint.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::error::FetchError;
use crate::types::WeatherRecord;

const USER_AGENT: &str = concat!("nimbus/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: Arc<Client>,
}

impl WeatherApiClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// `GET {base}/weather`: every known city.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_all(&self, base_url: &str) -> Result<Vec<WeatherRecord>, FetchError> {
        let url = format!("{}/weather", base_url);
        self.get_json(&url).await
    }

    /// `GET {base}/weather?city=<name>`: zero or one matching record.
    ///
    /// `city` is sent as given; callers normalize it first.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_city(
        &self,
        base_url: &str,
        city: &str,
    ) -> Result<Option<WeatherRecord>, FetchError> {
        let url = format!("{}/weather?city={}", base_url, urlencoding::encode(city));
        let records: Vec<WeatherRecord> = self.get_json(&url).await?;
        Ok(records.into_iter().next())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Weather API returned status {}", status);
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::InvalidResponse(e.to_string()))
    }
}
