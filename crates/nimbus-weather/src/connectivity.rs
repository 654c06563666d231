//! Network reachability checks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::FetchError;
use crate::resolver::BaseUrlResolver;

/// Reports whether the network is currently reachable.
///
/// Implementations never fail: when reachability can't be determined they
/// answer `false`, so callers fall back to cached data instead of hanging
/// on a doomed request.
#[async_trait]
pub trait ConnectivityOracle: Send + Sync {
    async fn is_connected(&self) -> bool;
}

/// Probes a URL with a short `HEAD` request.
///
/// Any HTTP answer, whatever its status, counts as reachable.
#[derive(Debug, Clone)]
pub struct HttpReachability {
    client: Client,
    probe_url: String,
}

impl HttpReachability {
    pub fn new(probe_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            probe_url: probe_url.into(),
        })
    }

    pub fn probe_url(&self) -> &str {
        &self.probe_url
    }
}

#[async_trait]
impl ConnectivityOracle for HttpReachability {
    async fn is_connected(&self) -> bool {
        head_answers(&self.client, &self.probe_url).await
    }
}

/// Probes whichever host the resolver currently selects.
///
/// Used when candidate hosts are configured without an explicit probe URL,
/// so reachability follows the host requests will actually go to.
pub struct ResolvedReachability {
    client: Client,
    resolver: Arc<dyn BaseUrlResolver>,
}

impl ResolvedReachability {
    pub fn new(resolver: Arc<dyn BaseUrlResolver>, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, resolver })
    }
}

#[async_trait]
impl ConnectivityOracle for ResolvedReachability {
    async fn is_connected(&self) -> bool {
        let base_url = self.resolver.resolve_base_url().await;
        head_answers(&self.client, &base_url).await
    }
}

async fn head_answers(client: &Client, url: &str) -> bool {
    match client.head(url).send().await {
        Ok(response) => {
            tracing::debug!("Reachability probe to {} answered {}", url, response.status());
            true
        }
        Err(e) => {
            tracing::debug!("Reachability probe to {} failed: {}", url, e);
            false
        }
    }
}

/// A fixed, switchable answer. Backs forced offline mode.
#[derive(Debug)]
pub struct StaticConnectivity {
    connected: AtomicBool,
}

impl StaticConnectivity {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: AtomicBool::new(connected),
        }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityOracle for StaticConnectivity {
    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ProbingBaseUrl, StaticBaseUrl};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_any_status_counts_as_reachable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let oracle = HttpReachability::new(mock_server.uri(), Duration::from_secs(2)).unwrap();
        assert!(oracle.is_connected().await);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_offline() {
        // Port 9 (discard) on localhost is closed in test environments
        let oracle =
            HttpReachability::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        assert!(!oracle.is_connected().await);
    }

    #[tokio::test]
    async fn test_resolved_probe_follows_live_candidate() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<u8>::new()))
            .mount(&mock_server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let candidates = vec!["http://127.0.0.1:9".to_string(), mock_server.uri()];
        let resolver = ProbingBaseUrl::new(&candidates, Duration::from_millis(500)).unwrap();
        let oracle =
            ResolvedReachability::new(Arc::new(resolver), Duration::from_millis(500)).unwrap();
        assert!(oracle.is_connected().await);
    }

    #[tokio::test]
    async fn test_resolved_probe_of_dead_host_is_offline() {
        let oracle = ResolvedReachability::new(
            Arc::new(StaticBaseUrl::new("http://127.0.0.1:9")),
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(!oracle.is_connected().await);
    }

    #[tokio::test]
    async fn test_static_connectivity_toggles() {
        let oracle = StaticConnectivity::offline();
        assert!(!oracle.is_connected().await);
        oracle.set_connected(true);
        assert!(oracle.is_connected().await);
    }
}
