//! Public events emitted to application callbacks.

use hiven_core::{House, Message};
use hiven_rest::{RestApi, SentMessage};
use serde_json::Value;
use std::ops::Deref;
use std::sync::Arc;

/// Public event names.
pub mod names {
    pub const READY: &str = "ready";
    pub const HOUSE_JOIN: &str = "houseJoin";
    pub const HOUSE_UPDATE: &str = "houseUpdate";
    pub const ROLE_CREATE: &str = "roleCreate";
    pub const ROLE_UPDATE: &str = "roleUpdate";
    pub const ROLE_DELETE: &str = "roleDelete";
    pub const MESSAGE_CREATE: &str = "messageCreate";
    pub const ROOM_CREATE: &str = "roomCreate";
    pub const ROOM_UPDATE: &str = "roomUpdate";
    pub const ROOM_DELETE: &str = "roomDelete";
}

/// Event tags the router models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    InitState,
    HouseJoin,
    HouseUpdate,
    RoleCreate,
    RoleUpdate,
    RoleDelete,
    MessageCreate,
    RoomCreate,
    RoomUpdate,
    RoomDelete,
}

impl EventKind {
    /// Every modeled kind.
    pub const ALL: [EventKind; 10] = [
        Self::InitState,
        Self::HouseJoin,
        Self::HouseUpdate,
        Self::RoleCreate,
        Self::RoleUpdate,
        Self::RoleDelete,
        Self::MessageCreate,
        Self::RoomCreate,
        Self::RoomUpdate,
        Self::RoomDelete,
    ];

    /// Resolve a wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Wire tag (`e`).
    pub fn tag(&self) -> &'static str {
        match self {
            Self::InitState => "INIT_STATE",
            Self::HouseJoin => "HOUSE_JOIN",
            Self::HouseUpdate => "HOUSE_UPDATE",
            Self::RoleCreate => "ROLE_CREATE",
            Self::RoleUpdate => "ROLE_UPDATE",
            Self::RoleDelete => "ROLE_DELETE",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::RoomCreate => "ROOM_CREATE",
            Self::RoomUpdate => "ROOM_UPDATE",
            Self::RoomDelete => "ROOM_DELETE",
        }
    }

    /// Public event name emitted alongside the raw tag.
    pub fn public_name(&self) -> &'static str {
        match self {
            Self::InitState => names::READY,
            Self::HouseJoin => names::HOUSE_JOIN,
            Self::HouseUpdate => names::HOUSE_UPDATE,
            Self::RoleCreate => names::ROLE_CREATE,
            Self::RoleUpdate => names::ROLE_UPDATE,
            Self::RoleDelete => names::ROLE_DELETE,
            Self::MessageCreate => names::MESSAGE_CREATE,
            Self::RoomCreate => names::ROOM_CREATE,
            Self::RoomUpdate => names::ROOM_UPDATE,
            Self::RoomDelete => names::ROOM_DELETE,
        }
    }
}

/// Payload handed to callbacks.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// `INIT_STATE` processed; the self user is set.
    Ready,
    /// A house joined, with members, rooms and entities stripped.
    HouseJoin(House),
    /// A house was overwritten.
    HouseUpdate(House),
    RoleCreate(Value),
    RoleUpdate(Value),
    RoleDelete(Value),
    /// A message arrived.
    MessageCreate(GatewayMessage),
    RoomCreate(Value),
    RoomUpdate(Value),
    RoomDelete(Value),
    /// Any data frame under its wire tag.
    Raw { tag: String, data: Value },
}

impl GatewayEvent {
    /// Name the event is emitted under.
    pub fn name(&self) -> &str {
        match self {
            Self::Ready => names::READY,
            Self::HouseJoin(_) => names::HOUSE_JOIN,
            Self::HouseUpdate(_) => names::HOUSE_UPDATE,
            Self::RoleCreate(_) => names::ROLE_CREATE,
            Self::RoleUpdate(_) => names::ROLE_UPDATE,
            Self::RoleDelete(_) => names::ROLE_DELETE,
            Self::MessageCreate(_) => names::MESSAGE_CREATE,
            Self::RoomCreate(_) => names::ROOM_CREATE,
            Self::RoomUpdate(_) => names::ROOM_UPDATE,
            Self::RoomDelete(_) => names::ROOM_DELETE,
            Self::Raw { tag, .. } => tag.as_str(),
        }
    }

    /// The message, for `messageCreate`.
    pub fn as_message(&self) -> Option<&GatewayMessage> {
        match self {
            Self::MessageCreate(message) => Some(message),
            _ => None,
        }
    }

    /// The house, for `houseJoin`/`houseUpdate`.
    pub fn as_house(&self) -> Option<&House> {
        match self {
            Self::HouseJoin(house) | Self::HouseUpdate(house) => Some(house),
            _ => None,
        }
    }

    /// The untyped payload, for role, room and raw events.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::RoleCreate(data)
            | Self::RoleUpdate(data)
            | Self::RoleDelete(data)
            | Self::RoomCreate(data)
            | Self::RoomUpdate(data)
            | Self::RoomDelete(data)
            | Self::Raw { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// A message received over the gateway, able to reply into its room.
#[derive(Clone)]
pub struct GatewayMessage {
    /// The message.
    pub message: Message,

    api: Arc<dyn RestApi>,
}

impl std::fmt::Debug for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayMessage")
            .field("message", &self.message)
            .finish()
    }
}

impl GatewayMessage {
    /// Bind a message to the API replies go through.
    pub fn new(message: Message, api: Arc<dyn RestApi>) -> Self {
        Self { message, api }
    }

    /// Send `content` into the room this message came from.
    pub async fn reply(&self, content: &str) -> hiven_rest::Result<SentMessage> {
        SentMessage::send(self.api.clone(), &self.message.room_id, content).await
    }
}

impl Deref for GatewayMessage {
    type Target = Message;

    fn deref(&self) -> &Message {
        &self.message
    }
}
