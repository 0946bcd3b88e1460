//! Bot token handling.

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A bot token, zeroed on drop and never printed.
///
/// The token is sent verbatim as the gateway `identify` payload and as the
/// `Authorization` header value of REST calls (no `Bearer`/`Bot` prefix).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BotToken {
    inner: String,
}

impl BotToken {
    /// Wrap a token without validation.
    ///
    /// Prefer [`BotToken::parse`] at trust boundaries.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            inner: value.into(),
        }
    }

    /// Validate and wrap a token. Empty or whitespace-only tokens are rejected.
    pub fn parse(value: impl Into<String>) -> Result<Self, ConfigError> {
        let token = Self::new(value);
        if token.inner.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        Ok(token)
    }

    /// Expose the raw token.
    ///
    /// Use sparingly - only when building a frame or a request header.
    pub fn expose(&self) -> &str {
        &self.inner
    }

    /// Check if the token is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

// Never print tokens
impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for BotToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(s))
    }
}

impl Serialize for BotToken {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Config files store the real value
        self.inner.serialize(serializer)
    }
}

impl From<String> for BotToken {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for BotToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
