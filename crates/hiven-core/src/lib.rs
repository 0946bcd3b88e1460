//! # hiven-core
//!
//! Shared functionality for the Hiven gateway client crates:
//!
//! - **Types**: Houses, Rooms, Roles, Users, Members and Messages as the
//!   gateway and REST API deliver them
//! - **Configuration**: Loading, validation, and persistence of the client config
//! - **Token**: Bot token handling with redaction and zeroize-on-drop
//! - **Utilities**: Path resolution and environment handling

pub mod config;
pub mod env;
pub mod error;
pub mod paths;
pub mod token;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::ConfigError;
pub use token::BotToken;
pub use types::*;
