//! Gateway error types.

use hiven_rest::RestError;
use thiserror::Error;

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur in a gateway session.
///
/// Errors raised inside the event loop are logged and never returned to the
/// application; errors from direct calls are returned to the caller.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or invalid token or settings. The session never starts.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connect failure or mid-session transport error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// An inbound frame or payload could not be decoded. The frame is dropped.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// An event referenced cache state that does not exist. The event is skipped.
    #[error("Protocol desync: {0}")]
    ProtocolDesync(String),

    /// A caller passed a malformed argument.
    #[error("Validation error: {0}")]
    Validation(String),

    /// REST call failed.
    #[error("REST error: {0}")]
    Rest(RestError),

    /// The session has been torn down.
    #[error("Session is closed")]
    Closed,
}

impl GatewayError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Create a malformed frame error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame(message.into())
    }

    /// Create a protocol desync error.
    pub fn desync(message: impl Into<String>) -> Self {
        Self::ProtocolDesync(message.into())
    }

    /// Whether the session keeps running after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedFrame(_) | Self::ProtocolDesync(_) | Self::Validation(_) | Self::Rest(_)
        )
    }
}

impl From<RestError> for GatewayError {
    fn from(err: RestError) -> Self {
        match err {
            RestError::Validation(message) => Self::Validation(message),
            other => Self::Rest(other),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
