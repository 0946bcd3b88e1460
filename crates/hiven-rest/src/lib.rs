//! REST API client for Hiven.
//!
//! This crate wraps the handful of HTTP endpoints the gateway client needs:
//! fetching a user and sending, editing, or deleting a message in a room.
//! Every request carries the bot token verbatim as its `Authorization` header.
//!
//! # Example
//!
//! ```rust,ignore
//! use hiven_rest::{RestApi, RestClient};
//!
//! let client = RestClient::new(token, "https://api.hiven.io")?;
//! let sent = client.send_message("room-id", "hello").await?;
//! sent.edit("hello, edited").await?;
//! ```

mod client;
mod error;
mod message;

pub use client::RestClient;
pub use error::{RestError, Result};
pub use message::SentMessage;

use async_trait::async_trait;
use hiven_core::{Message, User};

/// The REST operations the gateway client depends on.
///
/// [`RestClient`] is the HTTP implementation; tests substitute recorders.
#[async_trait]
pub trait RestApi: Send + Sync {
    /// Fetch a user. Returns `None` when the API answers `success: false`.
    async fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Post a message into a room, returning the created message.
    async fn send_message(&self, room_id: &str, content: &str) -> Result<Message>;

    /// Replace the content of a message.
    async fn edit_message(&self, room_id: &str, message_id: &str, content: &str) -> Result<()>;

    /// Delete a message.
    async fn delete_message(&self, room_id: &str, message_id: &str) -> Result<()>;
}

/// Check that an id is usable as a single path segment.
pub(crate) fn validate_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(RestError::validation(format!("The {} ID cannot be empty", kind)));
    }
    if let Some(c) = id.chars().find(|c| RESERVED_ID_CHARS.contains(c) || c.is_whitespace()) {
        return Err(RestError::validation(format!(
            "The {} ID cannot contain {:?}: {}",
            kind, c, id
        )));
    }
    Ok(())
}

/// Characters that would change the meaning of a URL path segment.
const RESERVED_ID_CHARS: [char; 5] = ['/', '\\', '?', '#', '%'];

/// Check that message content is non-empty.
pub(crate) fn validate_content(content: &str) -> Result<()> {
    if content.is_empty() {
        return Err(RestError::validation("The content cannot be empty"));
    }
    Ok(())
}
