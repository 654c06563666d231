//! Integration tests for the offline-aware fetch service using wiremock.
//!
//! Each test wires the service with an in-memory store, a manual clock and
//! a switchable connectivity oracle, then drives it against a mock server.

use std::sync::Arc;
use std::time::Duration;

use nimbus_storage::{KeyValueStore, MemoryStore, SqliteStore};
use nimbus_weather::{
    CacheStore, CitySearch, DataSource, FetchError, ManualClock, RecentSearches, SearchError,
    SearchOutcome, StaticBaseUrl, StaticConnectivity, WeatherApiClient, WeatherError,
    WeatherFetchService, WeatherRecord, CACHE_EXPIRATION_MS,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const T0: i64 = 1_700_000_000_000;
const MINUTE: i64 = 60 * 1000;

struct Harness {
    service: Arc<WeatherFetchService>,
    cache: CacheStore,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<ManualClock>,
    connectivity: Arc<StaticConnectivity>,
}

fn harness_with_store(base_url: &str, store: Arc<dyn KeyValueStore>) -> Harness {
    let clock = Arc::new(ManualClock::new(T0));
    let connectivity = Arc::new(StaticConnectivity::online());
    let cache = CacheStore::with_clock(store.clone(), clock.clone());
    let service = WeatherFetchService::new(
        Arc::new(StaticBaseUrl::new(base_url)),
        connectivity.clone(),
        cache.clone(),
        WeatherApiClient::new(Duration::from_secs(5)).unwrap(),
    );
    Harness {
        service: Arc::new(service),
        cache,
        store,
        clock,
        connectivity,
    }
}

fn harness(base_url: &str) -> Harness {
    harness_with_store(base_url, Arc::new(MemoryStore::new()))
}

fn record(id: i64, city: &str, temperature: f64) -> WeatherRecord {
    WeatherRecord {
        id,
        city: city.to_string(),
        temperature,
        condition: "Partly Cloudy".to_string(),
        humidity: 65,
        wind_speed: 12.0,
        icon: "partly-sunny".to_string(),
    }
}

fn all_cities() -> Vec<WeatherRecord> {
    vec![
        record(1, "London", 15.0),
        record(2, "Paris", 18.0),
        record(3, "Tokyo", 22.0),
    ]
}

#[tokio::test]
async fn test_online_fetch_refreshes_all_weather_cache() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(all_cities()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server.uri());
    h.cache.set_cached_data("all_weather", &vec![record(9, "Old", 0.0)]).await;
    h.clock.advance(10 * MINUTE);
    let before = T0 + 10 * MINUTE;

    let fetched = h.service.fetch_weather_data().await.unwrap();
    assert_eq!(fetched.source, DataSource::Network);
    assert_eq!(fetched.data, all_cities());

    let raw = h.store.get_item("weather_cache_all_weather").unwrap().unwrap();
    let entry: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(entry["timestamp"].as_i64().unwrap() >= before);
    let cached: Vec<WeatherRecord> = serde_json::from_value(entry["data"].clone()).unwrap();
    assert_eq!(cached, all_cities());
}

#[tokio::test]
async fn test_offline_with_cache_makes_no_network_calls() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(all_cities()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server.uri());
    h.cache.set_cached_data("all_weather", &all_cities()).await;
    h.connectivity.set_connected(false);

    let fetched = h.service.fetch_weather_data().await.unwrap();
    assert_eq!(fetched.source, DataSource::OfflineCache);
    assert_eq!(fetched.data, all_cities());
}

#[tokio::test]
async fn test_offline_without_cache_is_no_connectivity() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(all_cities()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server.uri());
    h.connectivity.set_connected(false);

    let err = h.service.fetch_weather_data().await.unwrap_err();
    assert!(matches!(err, WeatherError::NoConnectivity));

    let err = h.service.fetch_weather_by_city("London").await.unwrap_err();
    assert!(err.is_no_connectivity());
}

#[tokio::test]
async fn test_server_error_falls_back_to_cache() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server.uri());
    h.cache.set_cached_data("all_weather", &all_cities()).await;
    h.clock.advance(45 * MINUTE);

    let fetched = h.service.fetch_weather_data().await.unwrap();
    assert_eq!(fetched.source, DataSource::FallbackCache);
    assert_eq!(fetched.data, all_cities());

    // The stale-but-valid entry is not rewritten by a failed fetch
    assert_eq!(h.cache.cache_age("all_weather").await, Some(45 * MINUTE));
}

#[tokio::test]
async fn test_server_error_without_cache_carries_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server.uri());
    let err = h.service.fetch_weather_data().await.unwrap_err();
    match err {
        WeatherError::Fetch(FetchError::Status(status)) => assert_eq!(status, 503),
        other => panic!("expected status failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transport_error_falls_back_to_cache() {
    // Connectivity says online, but nothing listens on the endpoint
    let h = harness("http://127.0.0.1:9");
    h.cache.set_cached_data("city_London", &record(1, "London", 15.0)).await;

    let fetched = h.service.fetch_weather_by_city("london").await.unwrap();
    assert_eq!(fetched.source, DataSource::FallbackCache);
    assert_eq!(fetched.data.unwrap().temperature, 15.0);

    let err = h.service.fetch_weather_by_city("Madrid").await.unwrap_err();
    assert!(matches!(err, WeatherError::Fetch(FetchError::Network(_))));
}

#[tokio::test]
async fn test_malformed_body_falls_back_to_cache() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"unexpected\": true}"))
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server.uri());
    let err = h.service.fetch_weather_data().await.unwrap_err();
    assert!(matches!(err, WeatherError::Fetch(FetchError::InvalidResponse(_))));

    h.cache.set_cached_data("all_weather", &all_cities()).await;
    let fetched = h.service.fetch_weather_data().await.unwrap();
    assert_eq!(fetched.source, DataSource::FallbackCache);
}

#[tokio::test]
async fn test_city_not_found_is_not_an_error_and_not_cached() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("city", "Atlantis"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server.uri());
    let fetched = h.service.fetch_weather_by_city("atlantis").await.unwrap();
    assert_eq!(fetched.source, DataSource::Network);
    assert!(fetched.data.is_none());
    assert!(h.store.get_item("weather_cache_city_Atlantis").unwrap().is_none());

    // Negative results are not cached, so the second lookup hits the server again
    let again = h.service.fetch_weather_by_city("ATLANTIS").await.unwrap();
    assert!(again.data.is_none());
}

#[tokio::test]
async fn test_city_cache_scenario_across_ttl() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("city", "London"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![record(1, "London", 15.0)]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server.uri());

    // T0: online lookup populates city_London
    let fetched = h.service.fetch_weather_by_city("LONDON ").await.unwrap();
    assert!(fetched.is_fresh());

    // T0 + 30min, offline: served from cache
    h.connectivity.set_connected(false);
    h.clock.set(T0 + 30 * MINUTE);
    let cached = h.service.fetch_weather_by_city("london").await.unwrap();
    assert_eq!(cached.source, DataSource::OfflineCache);
    assert_eq!(cached.data.unwrap().temperature, 15.0);

    // T0 + 90min, offline: past TTL, entry evicted
    h.clock.set(T0 + 90 * MINUTE);
    let err = h.service.fetch_weather_by_city("london").await.unwrap_err();
    assert!(err.is_no_connectivity());
    assert!(h.store.get_item("weather_cache_city_London").unwrap().is_none());
}

#[tokio::test]
async fn test_ttl_boundary_is_inclusive() {
    let h = harness("http://127.0.0.1:9");
    h.cache.set_cached_data("all_weather", &all_cities()).await;
    h.connectivity.set_connected(false);

    h.clock.set(T0 + CACHE_EXPIRATION_MS);
    assert!(h.service.fetch_weather_data().await.is_ok());

    h.clock.set(T0 + CACHE_EXPIRATION_MS + 1);
    assert!(h.service.fetch_weather_data().await.is_err());
}

#[tokio::test]
async fn test_cache_survives_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nimbus.db");

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(all_cities()))
        .mount(&mock_server)
        .await;

    {
        let h = harness_with_store(&mock_server.uri(), Arc::new(SqliteStore::open(&db_path).unwrap()));
        h.service.fetch_weather_data().await.unwrap();
    }

    let h = harness_with_store(&mock_server.uri(), Arc::new(SqliteStore::open(&db_path).unwrap()));
    h.connectivity.set_connected(false);
    let fetched = h.service.fetch_weather_data().await.unwrap();
    assert_eq!(fetched.source, DataSource::OfflineCache);
    assert_eq!(fetched.data.len(), 3);
}

#[tokio::test]
async fn test_concurrent_requests_are_independent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("city", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![record(2, "Paris", 18.0)]))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(all_cities()))
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server.uri());
    let (all, paris) = tokio::join!(
        h.service.fetch_weather_data(),
        h.service.fetch_weather_by_city("paris"),
    );
    assert_eq!(all.unwrap().data.len(), 3);
    assert_eq!(paris.unwrap().data.unwrap().city, "Paris");

    assert!(h.store.get_item("weather_cache_all_weather").unwrap().is_some());
    assert!(h.store.get_item("weather_cache_city_Paris").unwrap().is_some());
}

#[tokio::test]
async fn test_search_records_canonical_city_in_recent() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("city", "Tokyo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![record(3, "Tokyo", 22.0)]))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("city", "Gotham"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let h = harness(&mock_server.uri());
    let recent = Arc::new(RecentSearches::with_clock(h.store.clone(), h.clock.clone()));
    let search = CitySearch::new(h.service.clone(), recent.clone());

    match search.search("  tokyo ").await.unwrap() {
        SearchOutcome::Found(fetched) => {
            assert!(fetched.is_fresh());
            assert_eq!(fetched.data.city, "Tokyo");
        }
        other => panic!("expected a hit, got {:?}", other),
    }

    let outcome = search.search("gotham").await.unwrap();
    assert_eq!(
        outcome,
        SearchOutcome::NotFound {
            query: "gotham".to_string()
        }
    );

    assert!(matches!(search.search("   ").await, Err(SearchError::EmptyQuery)));

    let history = recent.list().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].city, "Tokyo");
}
