//! Environment variable handling.

use std::env;

/// Get an environment variable, returning None if not set or empty.
pub fn get_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable as a u64 (e.g., for intervals).
pub fn get_u64(name: &str) -> Option<u64> {
    get_var(name).and_then(|v| v.parse().ok())
}

/// Environment variable names read by the client.
pub mod vars {
    /// Bot token.
    pub const HIVEN_TOKEN: &str = "HIVEN_TOKEN";

    /// Gateway WebSocket URL override.
    pub const HIVEN_GATEWAY_URL: &str = "HIVEN_GATEWAY_URL";

    /// REST API base URL override.
    pub const HIVEN_API_URL: &str = "HIVEN_API_URL";

    /// Default heartbeat interval override, in milliseconds.
    pub const HIVEN_HEARTBEAT_MS: &str = "HIVEN_HEARTBEAT_MS";

    /// Config file override.
    pub const HIVEN_CONFIG: &str = "HIVEN_CONFIG";

    /// Base directory override (defaults to `~/.hiven`).
    pub const HIVEN_HOME: &str = "HIVEN_HOME";
}
