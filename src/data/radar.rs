//! RainViewer radar client
//!
//! One `weather-maps.json` call describes all available past and nowcast
//! radar frames; frame selection against a requested instant happens
//! locally. The radar feed needs no credentials, so it keeps working when
//! the weather provider is unconfigured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::RadarFrame;
use crate::error::EngineError;
use crate::gateway::RadarProvider;

/// RainViewer weather maps index
const WEATHER_MAPS_URL: &str = "https://api.rainviewer.com/public/weather-maps.json";

/// Tile zoom used when building location-addressed tile URLs
const TILE_ZOOM: u32 = 8;

/// Client for the RainViewer public radar API
#[derive(Debug, Clone)]
pub struct RainViewerClient {
    client: Client,
    maps_url: String,
}

impl Default for RainViewerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RainViewerClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            maps_url: WEATHER_MAPS_URL.to_string(),
        }
    }

    /// Overrides the maps index URL.
    #[allow(dead_code)]
    pub fn with_maps_url(mut self, maps_url: impl Into<String>) -> Self {
        self.maps_url = maps_url.into();
        self
    }

    async fn fetch_maps(&self) -> Result<WeatherMaps, EngineError> {
        let response = self.client.get(&self.maps_url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(EngineError::Upstream(format!(
                "radar index request failed with HTTP {}",
                status
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| EngineError::Upstream(format!("malformed radar index: {}", e)))
    }
}

#[async_trait]
impl RadarProvider for RainViewerClient {
    async fn frame(
        &self,
        latitude: f64,
        longitude: f64,
        at: Option<DateTime<Utc>>,
    ) -> Result<RadarFrame, EngineError> {
        let maps = self.fetch_maps().await?;
        select_frame(&maps, latitude, longitude, at)
            .ok_or_else(|| EngineError::Upstream("radar index contained no past frames".into()))
    }
}

/// Picks the past frame nearest to `at` (the most recent frame when `at` is
/// `None`) and builds the location-addressed tile URL.
fn select_frame(
    maps: &WeatherMaps,
    latitude: f64,
    longitude: f64,
    at: Option<DateTime<Utc>>,
) -> Option<RadarFrame> {
    let past = &maps.radar.past;
    let chosen = match at {
        Some(at) => past
            .iter()
            .min_by_key(|f| (f.time - at.timestamp()).abs())?,
        None => past.last()?,
    };

    let timestamp = DateTime::from_timestamp(chosen.time, 0)?;
    let tile_path = format!(
        "{}{}/256/{}/{}/{}/2/1_1.png",
        maps.host, chosen.path, TILE_ZOOM, latitude, longitude
    );

    let nowcast_times = maps
        .radar
        .nowcast
        .iter()
        .filter_map(|f| DateTime::from_timestamp(f.time, 0))
        .collect::<Vec<_>>();

    Some(RadarFrame {
        timestamp,
        tile_path,
        coverage: maps.coverage,
        nowcast_available: !nowcast_times.is_empty(),
        nowcast_times,
    })
}

#[derive(Debug, Deserialize)]
struct WeatherMaps {
    host: String,
    radar: RadarFrames,
    /// Not every deployment of the API reports coverage
    coverage: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RadarFrames {
    #[serde(default)]
    past: Vec<FrameRef>,
    #[serde(default)]
    nowcast: Vec<FrameRef>,
}

#[derive(Debug, Deserialize)]
struct FrameRef {
    time: i64,
    path: String,
}
