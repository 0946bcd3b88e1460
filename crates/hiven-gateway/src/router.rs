//! Event router: the table from event tag to cache mutation and public event.
//!
//! Every data frame goes through [`EventRouter::dispatch`]. For a modeled tag
//! the router parses the payload, applies the cache mutation under one write
//! lock, releases the lock, and only then emits the public alias followed by
//! the raw tag. Unmodeled tags are emitted under their raw tag only.

use crate::cache::{CacheStore, SharedCache};
use crate::emitter::EventEmitter;
use crate::error::{GatewayError, Result};
use crate::events::{EventKind, GatewayEvent, GatewayMessage};
use hiven_core::{House, Member, Message, Role, Room, User};
use hiven_rest::RestApi;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};

/// Applies data frames to the cache and fans them out to listeners.
pub struct EventRouter {
    cache: SharedCache,
    emitter: Arc<EventEmitter<GatewayEvent>>,
    api: Arc<dyn RestApi>,
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("emitter", &self.emitter)
            .finish()
    }
}

/// A parsed, validated event ready to be applied.
enum Update {
    InitState(User),
    HouseJoin {
        house: House,
        members: Vec<Member>,
        rooms: Vec<Room>,
    },
    HouseUpdate(House),
    RoleUpsert { house_id: String, role: Role },
    RoleDelete { house_id: String, role_id: String },
    MessageCreate(Message),
    RoomUpsert(Room),
    RoomDelete(String),
}

#[derive(Deserialize)]
struct InitState {
    user: User,
}

#[derive(Deserialize)]
struct RoleRef {
    house_id: String,
    id: String,
}

#[derive(Deserialize)]
struct RoomRef {
    id: String,
}

impl EventRouter {
    /// Create a router writing into `cache` and emitting through `emitter`.
    pub fn new(
        cache: SharedCache,
        emitter: Arc<EventEmitter<GatewayEvent>>,
        api: Arc<dyn RestApi>,
    ) -> Self {
        Self {
            cache,
            emitter,
            api,
        }
    }

    /// Process one data frame.
    ///
    /// On error nothing has been written and nothing emitted.
    pub fn dispatch(&self, tag: &str, data: Value) -> Result<()> {
        let Some(kind) = EventKind::from_tag(tag) else {
            trace!(event = tag, "Forwarding unmodeled event");
            self.emit_raw(tag, data);
            return Ok(());
        };

        let update = parse(kind, &data)?;
        let event = {
            let mut cache = self.cache.write();
            // checked under the lock so teardown can wait out a mutation
            if self.emitter.is_closed() {
                return Err(GatewayError::Closed);
            }
            self.apply(&mut cache, kind, update, &data)?
        };

        debug!(event = tag, public = kind.public_name(), "Dispatching event");
        self.emitter.emit(kind.public_name(), &event);
        self.emit_raw(tag, data);
        Ok(())
    }

    fn emit_raw(&self, tag: &str, data: Value) {
        let event = GatewayEvent::Raw {
            tag: tag.to_string(),
            data,
        };
        self.emitter.emit(tag, &event);
    }

    /// Validate references against the cache, then mutate it.
    fn apply(
        &self,
        cache: &mut CacheStore,
        kind: EventKind,
        update: Update,
        data: &Value,
    ) -> Result<GatewayEvent> {
        let event = match update {
            Update::InitState(user) => {
                debug!(user = %user.id, "Session identity received");
                cache.set_self_user(user);
                GatewayEvent::Ready
            }
            Update::HouseJoin {
                house,
                members,
                rooms,
            } => {
                for user in members.into_iter().filter_map(|m| m.user) {
                    cache.upsert_user(user);
                }
                for room in rooms {
                    cache.upsert_room(room);
                }
                cache.upsert_house(house.clone());
                GatewayEvent::HouseJoin(house)
            }
            Update::HouseUpdate(house) => {
                cache.upsert_house(house.clone());
                GatewayEvent::HouseUpdate(house)
            }
            Update::RoleUpsert { house_id, role } => {
                owning_house(cache, &house_id, &role.id)?.upsert_role(role);
                if kind == EventKind::RoleCreate {
                    GatewayEvent::RoleCreate(data.clone())
                } else {
                    GatewayEvent::RoleUpdate(data.clone())
                }
            }
            Update::RoleDelete { house_id, role_id } => {
                if owning_house(cache, &house_id, &role_id)?
                    .remove_role(&role_id)
                    .is_none()
                {
                    debug!(house = %house_id, role = %role_id, "Deleted role was not cached");
                }
                GatewayEvent::RoleDelete(data.clone())
            }
            Update::MessageCreate(message) => {
                if !message.is_direct() {
                    if let Some(author) = message.author_user() {
                        cache.upsert_user(author.clone());
                    }
                }
                GatewayEvent::MessageCreate(GatewayMessage::new(message, self.api.clone()))
            }
            Update::RoomUpsert(room) => {
                cache.upsert_room(room);
                if kind == EventKind::RoomCreate {
                    GatewayEvent::RoomCreate(data.clone())
                } else {
                    GatewayEvent::RoomUpdate(data.clone())
                }
            }
            Update::RoomDelete(id) => {
                if !cache.remove_room(&id) {
                    debug!(room = %id, "Deleted room was not cached");
                }
                GatewayEvent::RoomDelete(data.clone())
            }
        };
        Ok(event)
    }
}

fn owning_house<'a>(cache: &'a mut CacheStore, house_id: &str, role_id: &str) -> Result<&'a mut House> {
    cache.house_mut(house_id).ok_or_else(|| {
        GatewayError::desync(format!(
            "role {} references house {} which is not cached",
            role_id, house_id
        ))
    })
}

fn from_value<T: DeserializeOwned>(kind: EventKind, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| GatewayError::malformed(format!("{} payload: {}", kind.tag(), e)))
}

fn object(kind: EventKind, data: &Value) -> Result<Map<String, Value>> {
    match data {
        Value::Object(map) => Ok(map.clone()),
        _ => Err(GatewayError::malformed(format!(
            "{} payload is not an object",
            kind.tag()
        ))),
    }
}

/// Take an array field out of a payload, treating absent or null as empty.
fn take_list<T: DeserializeOwned>(
    kind: EventKind,
    map: &mut Map<String, Value>,
    field: &str,
) -> Result<Vec<T>> {
    match map.remove(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => from_value(kind, value),
    }
}

fn parse(kind: EventKind, data: &Value) -> Result<Update> {
    let update = match kind {
        EventKind::InitState => {
            let init: InitState = from_value(kind, data.clone())?;
            Update::InitState(init.user)
        }
        EventKind::HouseJoin => {
            let mut map = object(kind, data)?;
            let members: Vec<Member> = take_list(kind, &mut map, "members")?;
            let mut rooms: Vec<Room> = take_list(kind, &mut map, "rooms")?;
            map.remove("entities");

            let house: House = from_value(kind, Value::Object(map))?;
            for room in &mut rooms {
                room.house_id.get_or_insert_with(|| house.id.clone());
            }
            Update::HouseJoin {
                house,
                members,
                rooms,
            }
        }
        EventKind::HouseUpdate => {
            let mut map = object(kind, data)?;
            map.remove("entities");
            map.remove("type");
            if let Some(house_id) = map.remove("house_id") {
                map.entry("id").or_insert(house_id);
            }
            Update::HouseUpdate(from_value(kind, Value::Object(map))?)
        }
        EventKind::RoleCreate | EventKind::RoleUpdate => {
            let mut map = object(kind, data)?;
            let house_id = match map.remove("house_id") {
                Some(Value::String(id)) => id,
                _ => {
                    return Err(GatewayError::malformed(format!(
                        "{} payload has no house_id",
                        kind.tag()
                    )))
                }
            };
            let role: Role = from_value(kind, Value::Object(map))?;
            Update::RoleUpsert { house_id, role }
        }
        EventKind::RoleDelete => {
            let role: RoleRef = from_value(kind, data.clone())?;
            Update::RoleDelete {
                house_id: role.house_id,
                role_id: role.id,
            }
        }
        EventKind::MessageCreate => Update::MessageCreate(from_value(kind, data.clone())?),
        EventKind::RoomCreate | EventKind::RoomUpdate => {
            Update::RoomUpsert(from_value(kind, data.clone())?)
        }
        EventKind::RoomDelete => {
            let room: RoomRef = from_value(kind, data.clone())?;
            Update::RoomDelete(room.id)
        }
    };
    Ok(update)
}
