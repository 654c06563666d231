//! Base URL resolution for the weather endpoint.
//!
//! Devices reach the development server under different addresses
//! (localhost, emulator bridge, LAN IP). Resolution is kept behind a trait
//! so the fetch service never deals with host detection itself.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;

#[async_trait]
pub trait BaseUrlResolver: Send + Sync {
    /// Base URL without a trailing slash.
    async fn resolve_base_url(&self) -> String;
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// A single configured base URL.
#[derive(Debug, Clone)]
pub struct StaticBaseUrl {
    base_url: String,
}

impl StaticBaseUrl {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: trim_base(base_url),
        }
    }
}

#[async_trait]
impl BaseUrlResolver for StaticBaseUrl {
    async fn resolve_base_url(&self) -> String {
        self.base_url.clone()
    }
}

/// Probes candidate hosts in order and sticks with the first that answers.
///
/// If no candidate answers, the first one is returned without being
/// remembered, so the next resolution probes again.
pub struct ProbingBaseUrl {
    client: Client,
    candidates: Vec<String>,
    resolved: Mutex<Option<String>>,
}

impl ProbingBaseUrl {
    pub fn new(candidates: &[String], probe_timeout: Duration) -> anyhow::Result<Self> {
        anyhow::ensure!(!candidates.is_empty(), "no candidate base URLs configured");

        let client = Client::builder().timeout(probe_timeout).build()?;
        Ok(Self {
            client,
            candidates: candidates.iter().map(|c| trim_base(c)).collect(),
            resolved: Mutex::new(None),
        })
    }

    /// The candidate chosen by a previous successful probe, if any.
    pub fn resolved(&self) -> Option<String> {
        self.resolved.lock().clone()
    }

    async fn answers(&self, candidate: &str) -> bool {
        let url = format!("{}/weather", candidate);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Candidate {} unreachable: {}", candidate, e);
                false
            }
        }
    }
}

#[async_trait]
impl BaseUrlResolver for ProbingBaseUrl {
    async fn resolve_base_url(&self) -> String {
        if let Some(url) = self.resolved() {
            return url;
        }

        for candidate in &self.candidates {
            if self.answers(candidate).await {
                tracing::info!("Using weather API at {}", candidate);
                *self.resolved.lock() = Some(candidate.clone());
                return candidate.clone();
            }
        }

        let fallback = self.candidates.first().cloned().unwrap_or_default();
        tracing::warn!(
            "No candidate weather API answered, falling back to {}",
            fallback
        );
        fallback
    }
}
