use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Buffered ticks a slow ticker consumer can fall behind by
pub const DEFAULT_TICKER_CAPACITY: usize = 1;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse clock config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid clock config: {0}")]
    Invalid(String),
}

/// Which backend the façade should bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendChoice {
    /// Controlled inside test binaries, native otherwise
    #[default]
    Auto,
    Native,
    Controlled,
}

/// Clock configuration
///
/// ```json
/// { "backend": "controlled", "ticker_capacity": 4 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    pub backend: BackendChoice,
    pub ticker_capacity: usize,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Auto,
            ticker_capacity: DEFAULT_TICKER_CAPACITY,
        }
    }
}

impl ClockConfig {
    /// Load configuration from a JSON string; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ClockConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticker_capacity == 0 {
            return Err(ConfigError::Invalid(
                "ticker_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
