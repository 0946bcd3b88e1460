//! Messages.

use super::{Attributes, Member, User};
use serde::{Deserialize, Serialize};

/// A message. Transient: messages are never retained in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Room the message was posted in.
    pub room_id: String,

    /// House the room belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_id: Option<String>,

    /// Author user ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,

    /// Author user object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,

    /// Author's house membership.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,

    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Present on direct/private messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_ids: Option<Vec<String>>,

    /// Remaining server fields.
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Message {
    /// Whether this is a direct/private message.
    pub fn is_direct(&self) -> bool {
        self.recipient_ids.is_some()
    }

    /// The author's user object, preferring the member's view of it.
    pub fn author_user(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.author.as_ref())
    }

    /// Text content, or an empty string.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}
