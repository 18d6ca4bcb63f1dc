//! Error types shared across the reindex pipeline.

use thiserror::Error;

/// Invalid or missing configuration.
///
/// Always fatal: nothing in the pipeline retries a configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A flag was given without a usable value
    #[error("Missing required argument: --{flag}")]
    MissingArgument { flag: String },

    /// A flag value is not an ISO 8601 timestamp
    #[error("Invalid {flag}: \"{value}\". Must be a valid ISO 8601 timestamp.")]
    InvalidTimestamp { flag: String, value: String },

    /// Explicit bounds describe an empty window
    #[error("Invalid time range: start {start} is after end {end}")]
    InvalidRange { start: String, end: String },

    /// A settings value failed validation
    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    /// Config sources could not be loaded or deserialized
    #[error("Configuration error: {0}")]
    Load(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::Load(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::MissingArgument {
            flag: "start-time".to_string(),
        };
        assert_eq!(err.to_string(), "Missing required argument: --start-time");

        let err = ConfigError::InvalidTimestamp {
            flag: "end-time".to_string(),
            value: "yesterday".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid end-time: \"yesterday\". Must be a valid ISO 8601 timestamp."
        );
    }
}
