//! Error types and utilities for pulse

use thiserror::Error;

/// Result type alias for pulse operations
pub type Result<T> = std::result::Result<T, PulseError>;

/// Main error type for pulse operations
#[derive(Error, Debug)]
pub enum PulseError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// I/O related errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network related errors (HTTP requests, etc.)
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Snapshot API related errors
    #[error("Snapshot API error: {message}")]
    Api {
        message: String,
        status_code: Option<u16>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Sample series not sorted or deduplicated by timestamp.
    ///
    /// This is a precondition violation on the caller's side and is never
    /// silently repaired; resorting here could mask an upstream data bug.
    #[error("Sample ordering violation for entity {entity_id}: {message}")]
    Ordering { entity_id: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors for user input or data
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Generic {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl PulseError {
    /// Create a new generic error with a custom message
    pub fn new(msg: impl Into<String>) -> Self {
        Self::Generic {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new generic error with a custom message and source
    pub fn with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Generic {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new configuration error with source
    pub fn config_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a new network error with source
    pub fn network_with_source(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            message: msg.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new snapshot API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api {
            message: msg.into(),
            status_code: None,
            source: None,
        }
    }

    /// Create a new snapshot API error with HTTP status code
    pub fn api_with_status(msg: impl Into<String>, status: u16) -> Self {
        Self::Api {
            message: msg.into(),
            status_code: Some(status),
            source: None,
        }
    }

    /// Create a new ordering violation error
    pub fn ordering(entity_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Ordering {
            entity_id: entity_id.into(),
            message: msg.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a new validation error with field name
    pub fn validation_field(msg: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Whether a failed request is worth retrying.
    ///
    /// Client errors (4xx) and local validation problems are permanent;
    /// timeouts, connection failures and server errors (5xx) are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } => true,
            Self::Api { status_code, .. } => {
                status_code.map_or(true, |code| code >= 500)
            }
            _ => false,
        }
    }
}

/// Convert from reqwest::Error to PulseError
impl From<reqwest::Error> for PulseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network_with_source("Request timeout", err)
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err)
        } else if err.is_status() {
            let status_code = err.status().map(|s| s.as_u16()).unwrap_or(0);
            Self::network_with_source(format!("HTTP error: {}", status_code), err)
        } else {
            Self::network_with_source("Network request failed", err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{error::Error, io};

    #[test]
    fn test_error_creation() {
        let error = PulseError::new("test message");
        assert!(error.to_string().contains("test message"));

        let config_error = PulseError::config("config issue");
        assert!(config_error.to_string().contains("Configuration error"));
        assert!(config_error.to_string().contains("config issue"));

        let api_error = PulseError::api_with_status("server error", 500);
        assert!(api_error.to_string().contains("Snapshot API error"));
        assert!(api_error.to_string().contains("server error"));

        let validation_error = PulseError::validation_field("Invalid input", "entity_id");
        assert!(validation_error.to_string().contains("Validation error"));
        assert!(validation_error.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_ordering_error_names_entity() {
        let error = PulseError::ordering("post:123", "timestamps not strictly increasing");
        let display = error.to_string();
        assert!(display.contains("post:123"));
        assert!(display.contains("not strictly increasing"));
    }

    #[test]
    fn test_error_with_source() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let wrapped_error = PulseError::with_source("Failed to read file", io_error);

        assert!(wrapped_error.to_string().contains("Failed to read file"));
        assert!(wrapped_error.source().is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let pulse_error: PulseError = io_error.into();

        assert!(pulse_error.to_string().contains("I/O error"));
        assert!(pulse_error.source().is_some());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(PulseError::network("timeout").is_retryable());
        assert!(PulseError::api_with_status("oops", 503).is_retryable());
        assert!(!PulseError::api_with_status("bad request", 400).is_retryable());
        assert!(!PulseError::validation("nope").is_retryable());
        assert!(!PulseError::ordering("a", "b").is_retryable());
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<String> {
            Ok("success".to_string())
        }

        fn returns_error() -> Result<String> {
            Err(PulseError::new("failure"))
        }

        assert!(returns_result().is_ok());
        assert!(returns_error().is_err());
    }
}
