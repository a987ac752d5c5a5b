//! Engine configuration
//!
//! The only required setting is the weather provider credential. Whether the
//! provider is configured is resolved once, at gateway construction; an
//! unconfigured engine still serves radar (degraded mode).

/// Settings for building an observation gateway
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// OpenWeather API key; `None` disables weather lookups
    pub openweather_api_key: Option<String>,
}

impl EngineConfig {
    /// Reads configuration from the environment (`OPENWEATHER_API_KEY`).
    pub fn from_env() -> Self {
        Self {
            openweather_api_key: usable_key(std::env::var("OPENWEATHER_API_KEY").ok()),
        }
    }

    /// Configuration with an explicit API key.
    pub fn with_api_key(key: impl Into<String>) -> Self {
        Self {
            openweather_api_key: Some(key.into()),
        }
    }
}

/// A key is usable only when it is present and non-blank.
fn usable_key(raw: Option<String>) -> Option<String> {
    raw.filter(|key| !key.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unconfigured() {
        assert!(EngineConfig::default().openweather_api_key.is_none());
    }

    #[test]
    fn test_with_api_key() {
        let config = EngineConfig::with_api_key("secret");
        assert_eq!(config.openweather_api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_usable_key_ignores_blank_and_missing() {
        assert!(usable_key(None).is_none());
        assert!(usable_key(Some(String::new())).is_none());
        assert!(usable_key(Some("   ".to_string())).is_none());
        assert_eq!(usable_key(Some("real-key".to_string())).as_deref(), Some("real-key"));
    }
}
