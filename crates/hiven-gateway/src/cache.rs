//! In-memory projection of the entities the gateway announces.
//!
//! Houses and users are keyed by id. Rooms live in one flat sequence shared
//! by all houses and are unique by id. Only the event router writes; every
//! other holder of a [`SharedCache`] gets read guards.

use hiven_core::{House, Room, User};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::HashMap;
use std::sync::Arc;

/// Typed entity tables for one session.
#[derive(Debug, Default)]
pub struct CacheStore {
    houses: HashMap<String, House>,
    users: HashMap<String, User>,
    rooms: Vec<Room>,
    self_user: Option<User>,
}

impl CacheStore {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a house by id.
    pub fn get_house(&self, id: &str) -> Option<&House> {
        self.houses.get(id)
    }

    /// Get a user by id.
    pub fn get_user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    /// Find a room by id. The first match wins.
    pub fn find_room(&self, id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    /// The identity of this client, set by `INIT_STATE`.
    pub fn self_user(&self) -> Option<&User> {
        self.self_user.as_ref()
    }

    /// All cached houses.
    pub fn houses(&self) -> impl Iterator<Item = &House> {
        self.houses.values()
    }

    /// All cached users.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// The room sequence, in insertion order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Rooms belonging to a house.
    pub fn rooms_in_house<'a>(&'a self, house_id: &'a str) -> impl Iterator<Item = &'a Room> + 'a {
        self.rooms
            .iter()
            .filter(move |r| r.house_id.as_deref() == Some(house_id))
    }

    /// Number of cached houses.
    pub fn house_count(&self) -> usize {
        self.houses.len()
    }

    /// Number of cached users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub(crate) fn set_self_user(&mut self, user: User) {
        self.self_user = Some(user);
    }

    /// Insert or overwrite a house.
    pub(crate) fn upsert_house(&mut self, house: House) {
        self.houses.insert(house.id.clone(), house);
    }

    pub(crate) fn house_mut(&mut self, id: &str) -> Option<&mut House> {
        self.houses.get_mut(id)
    }

    /// Insert or overwrite a user, stamping it as observed now.
    pub(crate) fn upsert_user(&mut self, mut user: User) {
        user.touch();
        self.users.insert(user.id.clone(), user);
    }

    /// Insert a room, replacing every entry with the same id.
    pub(crate) fn upsert_room(&mut self, room: Room) {
        self.rooms.retain(|r| r.id != room.id);
        self.rooms.push(room);
    }

    /// Remove every entry with the given id. Returns whether anything was removed.
    pub(crate) fn remove_room(&mut self, id: &str) -> bool {
        let before = self.rooms.len();
        self.rooms.retain(|r| r.id != id);
        self.rooms.len() != before
    }
}

/// Shared handle to a session's cache.
#[derive(Debug, Clone, Default)]
pub struct SharedCache {
    inner: Arc<RwLock<CacheStore>>,
}

impl SharedCache {
    /// Create a handle to an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the cache for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, CacheStore> {
        self.inner.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, CacheStore> {
        self.inner.write()
    }
}
