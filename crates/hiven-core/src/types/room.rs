//! Rooms.

use super::Attributes;
use serde::{Deserialize, Serialize};

/// A room (channel) in a house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Room ID.
    pub id: String,

    /// Owning house. Absent for private rooms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub house_id: Option<String>,

    /// Room name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Remaining server fields.
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Room {
    /// Create a room with the given id and owning house.
    pub fn new(id: impl Into<String>, house_id: Option<String>) -> Self {
        Self {
            id: id.into(),
            house_id,
            name: None,
            attributes: Attributes::new(),
        }
    }
}
