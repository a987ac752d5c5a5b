//! Error taxonomy for the favorability engine
//!
//! Each variant maps to a distinct caller decision: precondition violations
//! are caller bugs, `ConfigurationMissing` means the feature is unavailable
//! (not transient), and the upstream variants let callers decide whether a
//! retry makes sense. The engine itself never retries.

use thiserror::Error;

/// Errors surfaced by the observation gateway and orchestrator
#[derive(Debug, Error)]
pub enum EngineError {
    /// Coordinates outside [-90,90] latitude / [-180,180] longitude
    #[error("coordinates out of range: latitude {latitude}, longitude {longitude}")]
    InvalidLocation { latitude: f64, longitude: f64 },

    /// The sighting carries no location
    #[error("sighting has no location")]
    MissingLocation,

    /// The sighting carries no capture timestamp
    #[error("sighting has no capture timestamp")]
    MissingTimestamp,

    /// Weather provider has no credentials configured
    #[error("weather provider is not configured")]
    ConfigurationMissing,

    /// Upstream request exceeded the provider's timeout
    #[error("upstream request timed out")]
    Timeout,

    /// Upstream provider rejected the request due to rate limiting
    #[error("upstream rate limit exceeded")]
    RateLimited,

    /// Generic upstream provider failure
    #[error("upstream provider failure: {0}")]
    Upstream(String),

    /// Unexpected failure inside evaluation; logged as a defect
    #[error("internal engine failure: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EngineError::Timeout
        } else {
            EngineError::Upstream(err.to_string())
        }
    }
}
