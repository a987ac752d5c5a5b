//! Sighting assessment orchestration
//!
//! Answers "what were conditions for this sighting": a weather timeline
//! around the capture time, the radar frame at capture, and a favorability
//! assessment from the snapshot nearest to capture. Individual timeline
//! sample failures are logged and dropped; only a completely empty timeline
//! degrades to the explicit no-data assessment.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;

use crate::data::{Location, RadarFrame, RainbowAssessment, WeatherSnapshot};
use crate::error::EngineError;
use crate::favorability;
use crate::gateway::ObservationGateway;
use crate::sampler::{sample_window, DEFAULT_INTERVAL_MINUTES, DEFAULT_RANGE_HOURS};
use crate::solar;

/// What a photo-like caller supplies: any field may be missing and is
/// validated before any I/O happens.
#[derive(Debug, Clone, Default)]
pub struct SightingInput {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub captured_at: Option<DateTime<Utc>>,
}

/// Conditions around one sighting
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SightingConditions {
    /// Observations across the sampling window, ordered by time
    pub weather_timeline: Vec<WeatherSnapshot>,
    /// Radar frame at capture time, when available
    pub radar: Option<RadarFrame>,
    /// Favorability at the snapshot nearest to capture
    pub rainbow_assessment: RainbowAssessment,
}

/// Composes the sampler, gateway, solar calculator and evaluator
pub struct PhotoWeatherOrchestrator {
    gateway: Arc<ObservationGateway>,
}

impl PhotoWeatherOrchestrator {
    pub fn new(gateway: Arc<ObservationGateway>) -> Self {
        Self { gateway }
    }

    /// Assesses conditions for a sighting.
    ///
    /// Fails with `MissingLocation` / `MissingTimestamp` / `InvalidLocation`
    /// before any upstream call. The window's historical lookups run
    /// concurrently; a failed sample is dropped from the timeline, and a
    /// failed radar lookup yields `None` radar, neither aborts the request.
    pub async fn assess_sighting(
        &self,
        input: &SightingInput,
    ) -> Result<SightingConditions, EngineError> {
        let (latitude, longitude) = match (input.latitude, input.longitude) {
            (Some(lat), Some(lng)) => (lat, lng),
            _ => return Err(EngineError::MissingLocation),
        };
        let captured_at = input.captured_at.ok_or(EngineError::MissingTimestamp)?;
        let location = Location::new(latitude, longitude)?;

        let samples = sample_window(captured_at, DEFAULT_RANGE_HOURS, DEFAULT_INTERVAL_MINUTES);
        let lookups = samples
            .iter()
            .map(|at| self.gateway.historical_weather(&location, *at));

        let mut weather_timeline = Vec::with_capacity(samples.len());
        for (at, result) in samples.iter().zip(join_all(lookups).await) {
            match result {
                Ok(snapshot) => weather_timeline.push(snapshot),
                Err(err) => {
                    tracing::warn!(sample = %at, error = %err, "dropping failed timeline sample");
                }
            }
        }

        let radar = match self.gateway.radar(&location, Some(captured_at)).await {
            Ok(frame) => Some(frame),
            Err(err) => {
                tracing::warn!(error = %err, "radar unavailable for sighting");
                None
            }
        };

        let rainbow_assessment = match nearest_snapshot(&weather_timeline, captured_at) {
            Some(snapshot) => {
                let sun = solar::solar_position(&location, captured_at);
                favorability::evaluate(snapshot, Some(&sun))
            }
            None => favorability::no_data_assessment(),
        };

        Ok(SightingConditions {
            weather_timeline,
            radar,
            rainbow_assessment,
        })
    }
}

/// Snapshot closest in time to `captured_at`; ties break toward the
/// earliest snapshot.
fn nearest_snapshot(
    timeline: &[WeatherSnapshot],
    captured_at: DateTime<Utc>,
) -> Option<&WeatherSnapshot> {
    timeline.iter().min_by_key(|snapshot| {
        let distance = (snapshot.timestamp - captured_at).num_seconds().abs();
        (distance, snapshot.timestamp)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::gateway::{RadarProvider, WeatherProvider};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 15, h, m, 0).unwrap()
    }

    /// Weather mock that fails for timestamps listed in `failing_hours`
    struct ScriptedWeather {
        calls: AtomicUsize,
        failing_hours: Vec<u32>,
    }

    impl ScriptedWeather {
        fn new(failing_hours: Vec<u32>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                failing_hours,
            })
        }
    }

    #[async_trait]
    impl WeatherProvider for ScriptedWeather {
        async fn current(&self, _lat: f64, _lng: f64) -> Result<WeatherSnapshot, EngineError> {
            unreachable!("orchestrator never asks for current weather")
        }

        async fn historical(
            &self,
            _lat: f64,
            _lng: f64,
            at: DateTime<Utc>,
        ) -> Result<WeatherSnapshot, EngineError> {
            use chrono::Timelike;
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_hours.contains(&at.hour()) {
                return Err(EngineError::Timeout);
            }
            Ok(WeatherSnapshot {
                humidity: Some(80.0),
                cloud_cover: Some(50.0),
                visibility: Some(9000.0),
                rain_1h: Some(0.6),
                weather_code: Some(500),
                ..WeatherSnapshot::empty(at)
            })
        }
    }

    struct StubRadar {
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubRadar {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl RadarProvider for StubRadar {
        async fn frame(
            &self,
            _lat: f64,
            _lng: f64,
            at: Option<DateTime<Utc>>,
        ) -> Result<RadarFrame, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(EngineError::Upstream("radar offline".into()));
            }
            Ok(RadarFrame {
                timestamp: at.unwrap_or_else(Utc::now),
                tile_path: "https://tiles.example/frame.png".to_string(),
                coverage: None,
                nowcast_available: true,
                nowcast_times: vec![Utc::now()],
            })
        }
    }

    fn orchestrator(
        weather: Option<Arc<ScriptedWeather>>,
        radar: Arc<StubRadar>,
    ) -> PhotoWeatherOrchestrator {
        let gateway = ObservationGateway::new(
            weather.map(|w| w as Arc<dyn WeatherProvider>),
            radar as Arc<dyn RadarProvider>,
            Arc::new(MemoryStore::new()),
        );
        PhotoWeatherOrchestrator::new(Arc::new(gateway))
    }

    fn input(captured_at: DateTime<Utc>) -> SightingInput {
        SightingInput {
            latitude: Some(51.5),
            longitude: Some(0.0),
            captured_at: Some(captured_at),
        }
    }

    #[tokio::test]
    async fn test_missing_location_fails_before_any_io() {
        let weather = ScriptedWeather::new(vec![]);
        let radar = StubRadar::new(false);
        let orch = orchestrator(Some(Arc::clone(&weather)), Arc::clone(&radar));

        let result = orch
            .assess_sighting(&SightingInput {
                latitude: None,
                longitude: None,
                captured_at: Some(at(17, 0)),
            })
            .await;

        assert!(matches!(result, Err(EngineError::MissingLocation)));
        assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
        assert_eq!(radar.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_timestamp_fails_before_any_io() {
        let weather = ScriptedWeather::new(vec![]);
        let radar = StubRadar::new(false);
        let orch = orchestrator(Some(Arc::clone(&weather)), Arc::clone(&radar));

        let result = orch
            .assess_sighting(&SightingInput {
                latitude: Some(51.5),
                longitude: Some(0.0),
                captured_at: None,
            })
            .await;

        assert!(matches!(result, Err(EngineError::MissingTimestamp)));
        assert_eq!(weather.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_coordinates_are_rejected() {
        let orch = orchestrator(Some(ScriptedWeather::new(vec![])), StubRadar::new(false));

        let result = orch
            .assess_sighting(&SightingInput {
                latitude: Some(95.0),
                longitude: Some(0.0),
                captured_at: Some(at(17, 0)),
            })
            .await;

        assert!(matches!(result, Err(EngineError::InvalidLocation { .. })));
    }

    #[tokio::test]
    async fn test_full_timeline_and_assessment() {
        let weather = ScriptedWeather::new(vec![]);
        let orch = orchestrator(Some(Arc::clone(&weather)), StubRadar::new(false));

        // Evening in London: sun up and low, within the favorable band
        let conditions = orch.assess_sighting(&input(at(18, 0))).await.unwrap();

        assert_eq!(conditions.weather_timeline.len(), 13);
        assert_eq!(weather.calls.load(Ordering::SeqCst), 13);
        assert!(conditions.radar.is_some());

        let assessment = &conditions.rainbow_assessment;
        assert!(assessment.data_available);
        assert_eq!(assessment.score, 100);
        assert!(assessment.is_favorable);

        // Antisolar invariant holds between the reported fields
        let sun_azimuth = assessment.sun_azimuth.expect("sun azimuth known");
        let direction = assessment.rainbow_direction.as_ref().expect("direction known");
        assert!((direction.azimuth - (sun_azimuth + 180.0).rem_euclid(360.0)).abs() < 0.11);
    }

    #[tokio::test]
    async fn test_failed_samples_are_dropped_not_fatal() {
        // Fail hour 15, which covers the 15:00 and 15:30 samples
        let weather = ScriptedWeather::new(vec![15]);
        let orch = orchestrator(Some(Arc::clone(&weather)), StubRadar::new(false));

        let conditions = orch.assess_sighting(&input(at(18, 0))).await.unwrap();

        // Window 15:00..21:00; the two 15:xx samples fail
        assert_eq!(conditions.weather_timeline.len(), 11);
        assert!(conditions.rainbow_assessment.data_available);
    }

    #[tokio::test]
    async fn test_empty_timeline_yields_explicit_no_data() {
        let weather = ScriptedWeather::new((0..24).collect());
        let orch = orchestrator(Some(weather), StubRadar::new(false));

        let conditions = orch.assess_sighting(&input(at(18, 0))).await.unwrap();

        assert!(conditions.weather_timeline.is_empty());
        let assessment = &conditions.rainbow_assessment;
        assert!(!assessment.data_available);
        assert!(!assessment.is_favorable);
        assert!(assessment.recommendations[0].contains("No weather data"));
    }

    #[tokio::test]
    async fn test_radar_failure_does_not_abort() {
        let orch = orchestrator(Some(ScriptedWeather::new(vec![])), StubRadar::new(true));

        let conditions = orch.assess_sighting(&input(at(18, 0))).await.unwrap();

        assert!(conditions.radar.is_none());
        assert_eq!(conditions.weather_timeline.len(), 13);
    }

    #[test]
    fn test_nearest_snapshot_tie_breaks_earliest() {
        let earlier = WeatherSnapshot::empty(at(12, 0));
        let later = WeatherSnapshot::empty(at(12, 30));
        let timeline = vec![earlier.clone(), later];

        // 12:15 is equidistant; the earlier snapshot wins
        let chosen = nearest_snapshot(&timeline, at(12, 15)).expect("timeline not empty");
        assert_eq!(chosen.timestamp, earlier.timestamp);
    }

    #[test]
    fn test_nearest_snapshot_picks_closest() {
        let timeline = vec![
            WeatherSnapshot::empty(at(11, 0)),
            WeatherSnapshot::empty(at(12, 0)),
            WeatherSnapshot::empty(at(13, 0)),
        ];

        let chosen = nearest_snapshot(&timeline, at(12, 10)).expect("timeline not empty");
        assert_eq!(chosen.timestamp, at(12, 0));

        assert!(nearest_snapshot(&[], at(12, 0)).is_none());
    }
}
