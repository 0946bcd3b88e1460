//! Users and house members.

use super::Attributes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user as seen on the gateway or returned by the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID.
    pub id: String,

    /// Unique handle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Remaining server fields.
    #[serde(flatten)]
    pub attributes: Attributes,

    /// Wall-clock time this user was last observed by the client.
    #[serde(skip)]
    pub cached_received_timestamp: Option<DateTime<Utc>>,
}

impl User {
    /// Create a user with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: None,
            name: None,
            attributes: Attributes::new(),
            cached_received_timestamp: None,
        }
    }

    /// Stamp the user as observed now.
    pub fn touch(&mut self) {
        self.cached_received_timestamp = Some(Utc::now());
    }
}

/// A house member entry, wrapping the member's user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Member's user ID.
    pub user_id: String,

    /// House this membership belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_id: Option<String>,

    /// The member's user object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    /// Remaining server fields (roles, joined_at, ...).
    #[serde(flatten)]
    pub attributes: Attributes,
}
