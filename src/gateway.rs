//! Observation gateway
//!
//! Typed façade over the weather and radar providers with a write-through
//! read cache. TTLs: 15 minutes for current weather, 24 hours for historical
//! weather (a fixed instant's observation never changes once the provider
//! has it), 5 minutes for radar. No automatic retries; one upstream call per
//! request, with timeouts and rate limits surfaced as distinct error kinds
//! so callers can decide for themselves.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::EngineConfig;
use crate::data::{Location, OpenWeatherClient, RadarFrame, RainViewerClient, WeatherSnapshot};
use crate::error::EngineError;

/// Historical timestamps round to the nearest 30-minute boundary, bounding
/// upstream load regardless of sub-minute timestamp jitter.
const HISTORICAL_BUCKET_SECONDS: i64 = 30 * 60;

/// Radar instants round to the nearest 5 minutes, matching the radar TTL.
const RADAR_BUCKET_SECONDS: i64 = 5 * 60;

/// Source of current and historical weather observations
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot, EngineError>;

    async fn historical(
        &self,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, EngineError>;
}

/// Source of radar frames
#[async_trait]
pub trait RadarProvider: Send + Sync {
    async fn frame(
        &self,
        latitude: f64,
        longitude: f64,
        at: Option<DateTime<Utc>>,
    ) -> Result<RadarFrame, EngineError>;
}

/// Cached façade over the observation providers
///
/// The weather provider is optional: when unconfigured, every weather call
/// reports `ConfigurationMissing` while radar keeps working (partial
/// availability, not a hard failure). The cache store is injected so tests
/// and offline callers can substitute the in-memory implementation.
pub struct ObservationGateway {
    weather: Option<Arc<dyn WeatherProvider>>,
    radar: Arc<dyn RadarProvider>,
    cache: Arc<dyn CacheStore>,
}

impl ObservationGateway {
    pub fn new(
        weather: Option<Arc<dyn WeatherProvider>>,
        radar: Arc<dyn RadarProvider>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            weather,
            radar,
            cache,
        }
    }

    /// Builds a gateway with live HTTP providers; weather is enabled only
    /// when the configuration carries credentials.
    pub fn from_config(config: &EngineConfig, cache: Arc<dyn CacheStore>) -> Self {
        let weather = config
            .openweather_api_key
            .as_ref()
            .map(|key| Arc::new(OpenWeatherClient::new(key.clone())) as Arc<dyn WeatherProvider>);
        if weather.is_none() {
            tracing::warn!("no weather credentials; weather lookups disabled, radar still served");
        }

        Self::new(weather, Arc::new(RainViewerClient::new()), cache)
    }

    /// Current weather at a location, cached for 15 minutes.
    pub async fn current_weather(
        &self,
        location: &Location,
    ) -> Result<WeatherSnapshot, EngineError> {
        let weather = self
            .weather
            .as_ref()
            .ok_or(EngineError::ConfigurationMissing)?;

        let key = cache_key("current", location, "now");
        if let Some(snapshot) = self.cached(&key) {
            return Ok(snapshot);
        }

        let snapshot = weather
            .current(location.latitude(), location.longitude())
            .await?;
        self.store(&key, &snapshot, Duration::minutes(15));
        Ok(snapshot)
    }

    /// Historical weather at a location and instant, cached for 24 hours.
    ///
    /// The instant is rounded to the nearest 30-minute boundary before both
    /// key construction and the upstream call, so repeated lookups within
    /// the same half hour always hit cache.
    pub async fn historical_weather(
        &self,
        location: &Location,
        at: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, EngineError> {
        let weather = self
            .weather
            .as_ref()
            .ok_or(EngineError::ConfigurationMissing)?;

        let rounded = round_to_bucket(at, HISTORICAL_BUCKET_SECONDS);
        let key = cache_key("historical", location, &rounded.timestamp().to_string());
        if let Some(snapshot) = self.cached(&key) {
            return Ok(snapshot);
        }

        let snapshot = weather
            .historical(location.latitude(), location.longitude(), rounded)
            .await?;
        self.store(&key, &snapshot, Duration::hours(24));
        Ok(snapshot)
    }

    /// Radar frame at a location, cached for 5 minutes. A `None` instant
    /// requests the latest frame.
    pub async fn radar(
        &self,
        location: &Location,
        at: Option<DateTime<Utc>>,
    ) -> Result<RadarFrame, EngineError> {
        let bucket = match at {
            Some(at) => round_to_bucket(at, RADAR_BUCKET_SECONDS)
                .timestamp()
                .to_string(),
            None => "latest".to_string(),
        };
        let key = cache_key("radar", location, &bucket);
        if let Some(frame) = self.cached(&key) {
            return Ok(frame);
        }

        let frame = self
            .radar
            .frame(location.latitude(), location.longitude(), at)
            .await?;
        self.store(&key, &frame, Duration::minutes(5));
        Ok(frame)
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.cache.read(key)?;
        if entry.is_expired {
            tracing::debug!(key, "cache entry expired, refetching");
            return None;
        }
        serde_json::from_value(entry.data).ok()
    }

    fn store<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(json) => self.cache.write(key, json, ttl),
            Err(err) => tracing::warn!(key, error = %err, "failed to serialize cache value"),
        }
    }
}

/// Rounds an instant to the nearest bucket boundary (ties round up).
pub(crate) fn round_to_bucket(at: DateTime<Utc>, bucket_seconds: i64) -> DateTime<Utc> {
    let ts = at.timestamp();
    let rounded = (ts + bucket_seconds / 2).div_euclid(bucket_seconds) * bucket_seconds;
    DateTime::from_timestamp(rounded, 0).unwrap_or(at)
}

/// Coordinates round to 3 decimals (about 110 m) so nearby requests share
/// cache entries.
fn cache_key(kind: &str, location: &Location, bucket: &str) -> String {
    format!(
        "{}:{:.3}:{:.3}:{}",
        kind,
        location.latitude(),
        location.longitude(),
        bucket
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, h, m, 0).unwrap()
    }

    struct MockWeather {
        calls: AtomicUsize,
        last_historical_at: Mutex<Option<DateTime<Utc>>>,
    }

    impl MockWeather {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                last_historical_at: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WeatherProvider for MockWeather {
        async fn current(&self, _lat: f64, _lng: f64) -> Result<WeatherSnapshot, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(WeatherSnapshot {
                humidity: Some(70.0),
                ..WeatherSnapshot::empty(Utc::now())
            })
        }

        async fn historical(
            &self,
            _lat: f64,
            _lng: f64,
            at: DateTime<Utc>,
        ) -> Result<WeatherSnapshot, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_historical_at.lock().unwrap() = Some(at);
            Ok(WeatherSnapshot::empty(at))
        }
    }

    struct MockRadar {
        calls: AtomicUsize,
    }

    impl MockRadar {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RadarProvider for MockRadar {
        async fn frame(
            &self,
            _lat: f64,
            _lng: f64,
            at: Option<DateTime<Utc>>,
        ) -> Result<RadarFrame, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(RadarFrame {
                timestamp: at.unwrap_or_else(Utc::now),
                tile_path: "https://tiles.example/frame.png".to_string(),
                coverage: None,
                nowcast_available: false,
                nowcast_times: vec![],
            })
        }
    }

    fn gateway(
        weather: Option<Arc<MockWeather>>,
        radar: Arc<MockRadar>,
    ) -> ObservationGateway {
        ObservationGateway::new(
            weather.map(|w| w as Arc<dyn WeatherProvider>),
            radar as Arc<dyn RadarProvider>,
            Arc::new(MemoryStore::new()),
        )
    }

    #[tokio::test]
    async fn test_current_weather_served_from_cache() {
        let weather = MockWeather::new();
        let gw = gateway(Some(Arc::clone(&weather)), MockRadar::new());
        let loc = Location::new(49.28, -123.12).unwrap();

        let first = gw.current_weather(&loc).await.unwrap();
        let second = gw.current_weather(&loc).await.unwrap();

        assert_eq!(first, second, "cached value is identical");
        assert_eq!(weather.calls(), 1, "second read must not hit upstream");
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_fresh_upstream_call() {
        let weather = MockWeather::new();
        let cache = Arc::new(MemoryStore::new());
        let gw = ObservationGateway::new(
            Some(Arc::clone(&weather) as Arc<dyn WeatherProvider>),
            MockRadar::new() as Arc<dyn RadarProvider>,
            Arc::clone(&cache) as Arc<dyn CacheStore>,
        );
        let loc = Location::new(49.28, -123.12).unwrap();

        // Pre-populate the exact key with an already-expired entry
        let key = cache_key("current", &loc, "now");
        cache.write(&key, serde_json::json!({"bogus": true}), Duration::milliseconds(-1000));

        let snapshot = gw.current_weather(&loc).await.unwrap();
        assert_eq!(weather.calls(), 1, "expired entry must be refetched");
        assert_eq!(snapshot.humidity, Some(70.0));
    }

    #[tokio::test]
    async fn test_historical_lookups_share_half_hour_bucket() {
        let weather = MockWeather::new();
        let gw = gateway(Some(Arc::clone(&weather)), MockRadar::new());
        let loc = Location::new(49.28, -123.12).unwrap();

        gw.historical_weather(&loc, at(12, 1)).await.unwrap();
        gw.historical_weather(&loc, at(12, 14)).await.unwrap();
        assert_eq!(weather.calls(), 1, "same half hour hits cache");

        gw.historical_weather(&loc, at(12, 16)).await.unwrap();
        assert_eq!(weather.calls(), 2, "next bucket is a fresh fetch");
    }

    #[tokio::test]
    async fn test_historical_upstream_receives_rounded_instant() {
        let weather = MockWeather::new();
        let gw = gateway(Some(Arc::clone(&weather)), MockRadar::new());
        let loc = Location::new(49.28, -123.12).unwrap();

        gw.historical_weather(&loc, at(12, 7)).await.unwrap();
        assert_eq!(
            *weather.last_historical_at.lock().unwrap(),
            Some(at(12, 0)),
            "upstream call uses the rounded instant"
        );

        gw.historical_weather(&loc, at(12, 22)).await.unwrap();
        assert_eq!(*weather.last_historical_at.lock().unwrap(), Some(at(12, 30)));
    }

    #[tokio::test]
    async fn test_unconfigured_weather_still_serves_radar() {
        let radar = MockRadar::new();
        let gw = gateway(None, Arc::clone(&radar));
        let loc = Location::new(49.28, -123.12).unwrap();

        assert!(matches!(
            gw.current_weather(&loc).await,
            Err(EngineError::ConfigurationMissing)
        ));
        assert!(matches!(
            gw.historical_weather(&loc, at(12, 0)).await,
            Err(EngineError::ConfigurationMissing)
        ));

        let frame = gw.radar(&loc, None).await.unwrap();
        assert!(!frame.tile_path.is_empty());
        assert_eq!(radar.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_radar_cached_per_five_minute_bucket() {
        let radar = MockRadar::new();
        let gw = gateway(None, Arc::clone(&radar));
        let loc = Location::new(49.28, -123.12).unwrap();

        gw.radar(&loc, Some(at(12, 1))).await.unwrap();
        gw.radar(&loc, Some(at(12, 2))).await.unwrap();
        assert_eq!(radar.calls.load(Ordering::SeqCst), 1);

        gw.radar(&loc, Some(at(12, 4))).await.unwrap();
        assert_eq!(radar.calls.load(Ordering::SeqCst), 2, "next bucket refetches");
    }

    #[test]
    fn test_round_to_bucket_half_hour() {
        let noon = at(12, 0);
        for minute in 1..=14 {
            assert_eq!(
                round_to_bucket(at(12, minute), HISTORICAL_BUCKET_SECONDS),
                noon,
                "12:{:02} rounds down to 12:00",
                minute
            );
        }
        for minute in 16..=29 {
            assert_eq!(
                round_to_bucket(at(12, minute), HISTORICAL_BUCKET_SECONDS),
                at(12, 30),
                "12:{:02} rounds to 12:30",
                minute
            );
        }
        assert_eq!(round_to_bucket(at(12, 46), HISTORICAL_BUCKET_SECONDS), at(13, 0));
        assert_eq!(round_to_bucket(noon, HISTORICAL_BUCKET_SECONDS), noon);
    }

    #[test]
    fn test_cache_key_rounds_coordinates() {
        let loc = Location::new(49.27431, -123.15442).unwrap();
        assert_eq!(
            cache_key("historical", &loc, "1721034000"),
            "historical:49.274:-123.154:1721034000"
        );
    }
}
