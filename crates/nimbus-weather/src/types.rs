use serde::{Deserialize, Serialize};

/// One city's current conditions, as served by the weather endpoint.
///
/// `temperature` is always Celsius and `wind_speed` km/h; display
/// conversion happens in the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRecord {
    pub id: i64,
    pub city: String,
    pub temperature: f64,
    pub condition: String,
    pub humidity: i64,
    pub wind_speed: f64,
    pub icon: String,
}

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Live network response; the cache was refreshed.
    Network,
    /// Device was offline; served from an unexpired cache entry.
    OfflineCache,
    /// Network request failed; served from an unexpired cache entry.
    FallbackCache,
}

impl DataSource {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "live",
            Self::OfflineCache => "cached (offline)",
            Self::FallbackCache => "cached (network request failed)",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// A fetch result tagged with the path it was served from.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub source: DataSource,
}

impl<T> Fetched<T> {
    pub fn new(data: T, source: DataSource) -> Self {
        Self { data, source }
    }

    /// True when the data came straight from the network.
    pub fn is_fresh(&self) -> bool {
        self.source == DataSource::Network
    }

    pub fn into_inner(self) -> T {
        self.data
    }
}

/// Canonicalize a user-typed city name.
///
/// Trims surrounding whitespace, uppercases the first character and
/// lowercases the rest, so "LONDON ", "london" and "London" all map to
/// "London". The result is used both as cache key suffix and query value.
pub fn normalize_city_name(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_variants_agree() {
        assert_eq!(normalize_city_name("london"), "London");
        assert_eq!(normalize_city_name("LONDON "), "London");
        assert_eq!(normalize_city_name("London"), "London");
        assert_eq!(normalize_city_name("  lOnDoN\t"), "London");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_city_name("new YORK");
        assert_eq!(once, "New york");
        assert_eq!(normalize_city_name(&once), once);
    }

    #[test]
    fn test_normalize_empty_and_whitespace() {
        assert_eq!(normalize_city_name(""), "");
        assert_eq!(normalize_city_name("   "), "");
    }

    #[test]
    fn test_normalize_non_ascii() {
        assert_eq!(normalize_city_name("ÉVORA"), "Évora");
    }

    #[test]
    fn test_record_uses_camel_case_wind_speed() {
        let json = serde_json::json!({
            "id": 1,
            "city": "London",
            "temperature": 15.0,
            "condition": "Partly Cloudy",
            "humidity": 72,
            "windSpeed": 12.5,
            "icon": "partly-sunny"
        });
        let record: WeatherRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.wind_speed, 12.5);

        let back = serde_json::to_value(&record).unwrap();
        assert!(back.get("windSpeed").is_some());
    }

    #[test]
    fn test_record_accepts_any_integer_humidity() {
        let json = serde_json::json!([
            {"id": 1, "city": "A", "temperature": 1.0, "condition": "x",
             "humidity": 300, "windSpeed": 0.0, "icon": "i"},
            {"id": 2, "city": "B", "temperature": 1.0, "condition": "x",
             "humidity": -1, "windSpeed": 0.0, "icon": "i"}
        ]);
        let records: Vec<WeatherRecord> = serde_json::from_value(json).unwrap();
        assert_eq!(records[0].humidity, 300);
        assert_eq!(records[1].humidity, -1);
    }

    #[test]
    fn test_fetched_freshness() {
        assert!(Fetched::new((), DataSource::Network).is_fresh());
        assert!(!Fetched::new((), DataSource::OfflineCache).is_fresh());
        assert!(!Fetched::new((), DataSource::FallbackCache).is_fresh());
    }
}
