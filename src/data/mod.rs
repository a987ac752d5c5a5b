//! Core value types for the rainbow favorability engine
//!
//! Everything here is created per-request and discarded; only the
//! observation gateway's cache persists values across requests. All public
//! result types serialize to camelCase JSON because that is what the
//! surrounding application speaks.

pub mod radar;
pub mod weather;

pub use radar::RainViewerClient;
pub use weather::OpenWeatherClient;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A validated geographic point
///
/// Constructed through [`Location::new`] only, so a `Location` in hand is
/// always within range. Out-of-range coordinates are a caller contract
/// violation, never silently clamped.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

impl Location {
    /// Creates a location, rejecting coordinates outside
    /// [-90,90] latitude / [-180,180] longitude.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, EngineError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(EngineError::InvalidLocation {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees, north positive
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees, east positive
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// A single atmospheric observation at a point in time
///
/// Produced by the weather provider and immutable once fetched. Any field
/// may be absent; absent means "unknown", never zero. The one exception is
/// precipitation: missing rain/snow amounts are read as 0 mm downstream,
/// matching the provider's habit of omitting the keys entirely when dry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Air temperature in Celsius
    pub temperature: Option<f64>,
    /// Relative humidity percentage (0-100)
    pub humidity: Option<f64>,
    /// Barometric pressure in hPa
    pub pressure: Option<f64>,
    /// Wind speed in m/s
    pub wind_speed: Option<f64>,
    /// Wind direction in degrees
    pub wind_direction: Option<f64>,
    /// Cloud cover percentage (0-100)
    pub cloud_cover: Option<f64>,
    /// Horizontal visibility in meters
    pub visibility: Option<f64>,
    /// Provider condition code (OpenWeather id scheme)
    pub weather_code: Option<i32>,
    /// Rain over the last hour in mm
    pub rain_1h: Option<f64>,
    /// Provider condition group, e.g. "Rain"
    pub precipitation_type: Option<String>,
    /// Snow over the last hour in mm
    pub snow_1h: Option<f64>,
}

impl WeatherSnapshot {
    /// An observation with a timestamp and nothing else known
    pub fn empty(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            temperature: None,
            humidity: None,
            pressure: None,
            wind_speed: None,
            wind_direction: None,
            cloud_cover: None,
            visibility: None,
            weather_code: None,
            rain_1h: None,
            precipitation_type: None,
            snow_1h: None,
        }
    }
}

/// Solar geometry for one location and instant
///
/// Deterministic function of (location, instant); see [`crate::solar`].
/// Sunrise/sunset and golden hour are `None` during polar day or night.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SunPosition {
    /// Altitude above the horizon in degrees, signed
    pub altitude: f64,
    /// Compass bearing to the sun in degrees, [0,360), 0 = north
    pub azimuth: f64,
    /// Whether the sun is above the horizon
    pub is_daytime: bool,
    /// Sunrise for the UTC calendar day, absolute instant
    pub sunrise: Option<DateTime<Utc>>,
    /// Sunset for the UTC calendar day, absolute instant
    pub sunset: Option<DateTime<Utc>>,
    /// Solar transit for the UTC calendar day
    pub solar_noon: DateTime<Utc>,
    /// Evening golden hour start (sun descending through 6°)
    pub golden_hour_start: Option<DateTime<Utc>>,
    /// Evening golden hour end (sunset)
    pub golden_hour_end: Option<DateTime<Utc>>,
}

/// One radar tile reference plus nowcast availability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarFrame {
    /// Frame generation time
    pub timestamp: DateTime<Utc>,
    /// Tile URL for the frame at the requested coordinates
    pub tile_path: String,
    /// Fraction of the tile with radar returns, when the provider reports it
    pub coverage: Option<f64>,
    /// Whether nowcast frames are available
    pub nowcast_available: bool,
    /// Timestamps of available nowcast frames
    pub nowcast_times: Vec<DateTime<Utc>>,
}

/// Verdict for a single favorability factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionVerdict {
    /// The underlying observed value, if known
    pub value: Option<f64>,
    /// Whether this factor supports a rainbow
    pub favorable: bool,
    /// Human-readable explanation
    pub reason: String,
}

/// Per-factor verdicts in the engine's fixed factor order
///
/// A struct rather than a map so serialization order is deterministic and
/// matches the factor order used for recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSet {
    pub sun_altitude: ConditionVerdict,
    pub precipitation: ConditionVerdict,
    pub humidity: ConditionVerdict,
    pub cloud_cover: ConditionVerdict,
    pub visibility: ConditionVerdict,
}

/// Compass direction to look for the rainbow (always antisolar)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RainbowDirection {
    /// Bearing in degrees, [0,360)
    pub azimuth: f64,
    /// 16-point compass label, e.g. "WNW"
    pub cardinal: String,
    /// Human-readable viewing hint
    pub description: String,
}

/// Complete favorability assessment for one snapshot and sun position
///
/// Purely derived; recomputed on every call and never persisted by this
/// subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RainbowAssessment {
    /// True when the weighted score reaches the 60-point threshold
    pub is_favorable: bool,
    /// Weighted score, 0-100
    pub score: u8,
    /// Per-factor verdicts
    pub conditions: ConditionSet,
    /// Where to look; `None` when sun geometry is unknown
    pub rainbow_direction: Option<RainbowDirection>,
    /// Sun altitude in degrees, if known
    pub sun_altitude: Option<f64>,
    /// Sun compass azimuth in degrees, if known
    pub sun_azimuth: Option<f64>,
    /// Headline followed by one corrective line per unfavorable factor
    pub recommendations: Vec<String>,
    /// False only when no weather data existed for the request at all
    pub data_available: bool,
}
