//! Weather-specific error types.

use nimbus_core::{AppError, NetworkError, ReqwestErrorExt};
use thiserror::Error;

/// Why a live request to the weather endpoint failed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP error! status: {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Malformed response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::InvalidResponse(e.to_string())
        } else {
            FetchError::Network(e.into_network_error())
        }
    }
}

impl FetchError {
    /// HTTP status that caused the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status(code) => Some(*code),
            _ => None,
        }
    }
}

/// Hard failures surfaced by the fetch service.
///
/// Only raised when no unexpired cache entry could stand in for the
/// network result.
#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("No internet connection and no cached data available")]
    NoConnectivity,

    #[error("Failed to fetch weather data: {0}")]
    Fetch(#[from] FetchError),
}

impl WeatherError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::NoConnectivity => {
                "No internet connection and no saved weather data. Check your connection and try again."
                    .to_string()
            }
            Self::Fetch(FetchError::Status(code)) => {
                format!("Weather request failed (HTTP {}). Please try again.", code)
            }
            Self::Fetch(FetchError::Network(e)) => e.user_message().to_string(),
            Self::Fetch(FetchError::InvalidResponse(_)) => {
                "Weather request failed: the server sent an unexpected response.".to_string()
            }
        }
    }

    pub fn is_no_connectivity(&self) -> bool {
        matches!(self, Self::NoConnectivity)
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        match e {
            WeatherError::NoConnectivity => AppError::Offline,
            WeatherError::Fetch(FetchError::Status(status)) => {
                AppError::Network(NetworkError::ServerError {
                    status,
                    message: format!("HTTP error! status: {}", status),
                })
            }
            WeatherError::Fetch(FetchError::Network(n)) => AppError::Network(n),
            WeatherError::Fetch(FetchError::InvalidResponse(msg)) => {
                AppError::Network(NetworkError::InvalidResponse(msg))
            }
        }
    }
}

/// Errors from the interactive city search flow.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Please enter a city name")]
    EmptyQuery,

    #[error(transparent)]
    Weather(#[from] WeatherError),
}

impl SearchError {
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyQuery => "Please enter a city name".to_string(),
            Self::Weather(e) => e.user_message(),
        }
    }
}
