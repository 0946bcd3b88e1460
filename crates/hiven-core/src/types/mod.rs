//! Entity types shared by the gateway and REST crates.
//!
//! Every entity keeps the fields the client reasons about as typed fields and
//! carries everything else in a flattened `attributes` bag, so unmodeled
//! server fields survive a round trip.

mod house;
mod message;
mod room;
mod user;

pub use house::*;
pub use message::*;
pub use room::*;
pub use user::*;

/// Attribute bag for server fields without a typed counterpart.
pub type Attributes = serde_json::Map<String, serde_json::Value>;
