//! OpenWeather One Call client
//!
//! Fetches current and historical (timemachine) observations and maps them
//! into [`WeatherSnapshot`]s. Provider fields that are absent stay `None`;
//! nothing is defaulted to zero here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::WeatherSnapshot;
use crate::error::EngineError;
use crate::gateway::WeatherProvider;

/// Base URL for the One Call 3.0 API
const ONE_CALL_BASE_URL: &str = "https://api.openweathermap.org/data/3.0/onecall";

/// Client for the OpenWeather One Call API
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    /// Creates a client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: ONE_CALL_BASE_URL.to_string(),
        }
    }

    /// Overrides the endpoint base URL.
    #[allow(dead_code)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, url: String) -> Result<OneCallResponse, EngineError> {
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(error_for_status(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| EngineError::Upstream(format!("malformed provider response: {}", e)))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot, EngineError> {
        let url = format!(
            "{}?lat={}&lon={}&units=metric&exclude=minutely,hourly,daily,alerts&appid={}",
            self.base_url, latitude, longitude, self.api_key
        );

        let parsed = self.fetch(url).await?;
        let observation = parsed
            .current
            .ok_or_else(|| EngineError::Upstream("response missing current observation".into()))?;
        Ok(observation.into_snapshot())
    }

    async fn historical(
        &self,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<WeatherSnapshot, EngineError> {
        let url = format!(
            "{}/timemachine?lat={}&lon={}&dt={}&units=metric&appid={}",
            self.base_url,
            latitude,
            longitude,
            at.timestamp(),
            self.api_key
        );

        let parsed = self.fetch(url).await?;
        let observation = parsed
            .data
            .and_then(|mut d| if d.is_empty() { None } else { Some(d.remove(0)) })
            .ok_or_else(|| EngineError::Upstream("response missing historical observation".into()))?;
        Ok(observation.into_snapshot())
    }
}

/// Maps a non-success HTTP status onto the engine error taxonomy.
fn error_for_status(status: StatusCode, body: &str) -> EngineError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        EngineError::ConfigurationMissing
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        EngineError::RateLimited
    } else if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        EngineError::Timeout
    } else {
        EngineError::Upstream(format!("HTTP {}: {}", status, truncate_body(body)))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    // Error bodies can be arbitrary UTF-8; cut on a char boundary.
    let mut cut = MAX;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &body[..cut])
}

/// One Call response, shared between the current and timemachine endpoints
#[derive(Debug, Deserialize)]
struct OneCallResponse {
    current: Option<ObservationDto>,
    data: Option<Vec<ObservationDto>>,
}

#[derive(Debug, Deserialize)]
struct ObservationDto {
    dt: i64,
    temp: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
    wind_speed: Option<f64>,
    wind_deg: Option<f64>,
    clouds: Option<f64>,
    visibility: Option<f64>,
    #[serde(default)]
    weather: Vec<ConditionDto>,
    rain: Option<PrecipitationDto>,
    snow: Option<PrecipitationDto>,
}

#[derive(Debug, Deserialize)]
struct ConditionDto {
    id: i32,
    main: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PrecipitationDto {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

impl ObservationDto {
    fn into_snapshot(self) -> WeatherSnapshot {
        let timestamp = DateTime::from_timestamp(self.dt, 0).unwrap_or_else(Utc::now);
        let condition = self.weather.into_iter().next();

        WeatherSnapshot {
            timestamp,
            temperature: self.temp,
            humidity: self.humidity,
            pressure: self.pressure,
            wind_speed: self.wind_speed,
            wind_direction: self.wind_deg,
            cloud_cover: self.clouds,
            visibility: self.visibility,
            weather_code: condition.as_ref().map(|c| c.id),
            rain_1h: self.rain.and_then(|r| r.one_hour),
            precipitation_type: condition.and_then(|c| c.main),
            snow_1h: self.snow.and_then(|s| s.one_hour),
        }
    }
}
