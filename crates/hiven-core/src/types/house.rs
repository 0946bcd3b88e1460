//! Houses and their roles.

use super::Attributes;
use serde::{Deserialize, Serialize};

/// A house (community) as stored in the cache.
///
/// Rooms are not embedded; they live in the cache's flat room sequence and
/// point back through [`crate::Room::house_id`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct House {
    /// House ID.
    pub id: String,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Owner user ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Roles scoped to this house, unique by id.
    #[serde(default)]
    pub roles: Vec<Role>,

    /// Remaining server fields.
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl House {
    /// Create an empty house with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            owner_id: None,
            roles: Vec::new(),
            attributes: Attributes::new(),
        }
    }

    /// Look up a role by id.
    pub fn role(&self, id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }

    /// Insert a role, replacing any role with the same id.
    pub fn upsert_role(&mut self, role: Role) {
        self.roles.retain(|r| r.id != role.id);
        self.roles.push(role);
    }

    /// Remove a role by id, returning it if present.
    pub fn remove_role(&mut self, id: &str) -> Option<Role> {
        let pos = self.roles.iter().position(|r| r.id == id)?;
        Some(self.roles.remove(pos))
    }
}

/// A role within a house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    /// Role ID.
    pub id: String,

    /// Role name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Remaining server fields.
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Role {
    /// Create a role with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            attributes: Attributes::new(),
        }
    }
}
