//! Rainbow favorability engine
//!
//! Given a geographic point and a timestamp, computes solar geometry, fuses
//! it with atmospheric observations, and produces a quantitative,
//! explainable prediction of whether a rainbow is observable, including the
//! compass direction to look. This crate is the engine behind a
//! rainbow-sighting application; users, photos and persistence live in the
//! surrounding app, not here.

pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod favorability;
pub mod gateway;
pub mod orchestrator;
pub mod sampler;
pub mod solar;

pub use config::EngineConfig;
pub use data::{
    Location, RadarFrame, RainbowAssessment, RainbowDirection, SunPosition, WeatherSnapshot,
};
pub use error::EngineError;
pub use gateway::ObservationGateway;
pub use orchestrator::{PhotoWeatherOrchestrator, SightingConditions, SightingInput};
