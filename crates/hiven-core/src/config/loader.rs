//! Configuration loading and persistence.

use super::{Config, LogFormat, LogLevel};
use crate::env;
use crate::error::ConfigError;
use crate::paths;
use crate::token::BotToken;
use std::fs;
use std::path::Path;
use tracing::debug;

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = paths::config_file()?;
        Self::load(&path)
    }

    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::Json5(e.to_string()))
    }

    /// Save configuration to a file path.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_json5()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write atomically
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Serialize to JSON5 string.
    pub fn to_json5(&self) -> Result<String, ConfigError> {
        // json5 has no serializer; JSON is valid JSON5
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from `path` (or the default location), then apply environment
    /// overrides. A missing file yields defaults plus overrides.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let loaded = match path {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        };

        let mut config = match loaded {
            Ok(config) => config,
            Err(ConfigError::NotFound(path)) => {
                debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e),
        };

        config.apply_env();
        Ok(config)
    }

    /// Apply `HIVEN_*` environment overrides in place.
    pub fn apply_env(&mut self) {
        if let Some(token) = env::get_var(env::vars::HIVEN_TOKEN) {
            self.token = Some(BotToken::new(token));
        }
        if let Some(url) = env::get_var(env::vars::HIVEN_GATEWAY_URL) {
            self.gateway.url = url;
        }
        if let Some(url) = env::get_var(env::vars::HIVEN_API_URL) {
            self.api.base_url = url;
        }
        if let Some(ms) = env::get_u64(env::vars::HIVEN_HEARTBEAT_MS) {
            self.gateway.heartbeat_interval_ms = ms;
        }
    }

    /// The configured token, validated.
    pub fn require_token(&self) -> Result<BotToken, ConfigError> {
        match &self.token {
            Some(token) => BotToken::parse(token.expose()),
            None => Err(ConfigError::MissingToken),
        }
    }

    /// Validate the configuration, collecting all errors before returning.
    ///
    /// The token is not checked here; see [`Config::require_token`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        match url::Url::parse(&self.gateway.url) {
            Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
            Ok(url) => errors.push(format!(
                "Gateway URL must use ws or wss, got '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!("Invalid gateway URL '{}': {}", self.gateway.url, e)),
        }

        if self.gateway.heartbeat_interval_ms == 0 {
            errors.push("Heartbeat interval must be greater than 0".to_string());
        }

        if self.gateway.connect_timeout_secs == 0 {
            errors.push("Gateway connect timeout must be greater than 0".to_string());
        }

        match url::Url::parse(&self.api.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "API URL must use http or https, got '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!("Invalid API URL '{}': {}", self.api.base_url, e)),
        }

        if self.api.timeout_secs == 0 {
            errors.push("API timeout must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors.join("; ")))
        }
    }
}

/// Configuration builder for creating configs programmatically.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new config builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bot token.
    pub fn token(mut self, token: impl Into<BotToken>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    /// Set the gateway URL.
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.config.gateway.url = url.into();
        self
    }

    /// Set the default heartbeat interval.
    pub fn heartbeat_interval_ms(mut self, ms: u64) -> Self {
        self.config.gateway.heartbeat_interval_ms = ms;
        self
    }

    /// Set the REST API base URL.
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api.base_url = url.into();
        self
    }

    /// Set the log level.
    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set the log format.
    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Build the config.
    pub fn build(self) -> Config {
        self.config
    }

    /// Validate and build the config, returning an error if validation fails.
    pub fn build_validated(self) -> Result<Config, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
