//! Error types for REST calls.

use thiserror::Error;

/// Result type for REST operations.
pub type Result<T> = std::result::Result<T, RestError>;

/// REST error types.
#[derive(Debug, Error)]
pub enum RestError {
    /// A caller passed an argument the API cannot accept.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Non-2xx response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The API answered with `success: false`.
    #[error("Request unsuccessful: {0}")]
    Unsuccessful(String),

    /// Network error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RestError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the request never left the client.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
