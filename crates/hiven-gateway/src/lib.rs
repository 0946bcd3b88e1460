//! Gateway client runtime for Hiven bots.
//!
//! This crate provides:
//! - The gateway frame codec and heartbeat
//! - A session that identifies, keeps alive, and processes events in order
//! - An event router that keeps an in-memory cache of houses, rooms and users
//! - Named callbacks for public and raw events, with `reply` on messages
//!
//! # Example
//!
//! ```rust,ignore
//! use hiven_gateway::{names, GatewayEvent, SessionBuilder};
//!
//! let session = SessionBuilder::new(token)
//!     .on(names::MESSAGE_CREATE, |event: &GatewayEvent| {
//!         if let Some(message) = event.as_message() {
//!             println!("{}", message.text());
//!         }
//!     })
//!     .connect()
//!     .await?;
//! session.closed().await;
//! ```

pub mod cache;
pub mod codec;
pub mod emitter;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod router;
pub mod session;

pub use cache::{CacheStore, SharedCache};
pub use codec::Envelope;
pub use emitter::EventEmitter;
pub use error::{GatewayError, Result};
pub use events::{names, EventKind, GatewayEvent, GatewayMessage};
pub use heartbeat::HeartbeatScheduler;
pub use router::EventRouter;
pub use session::{Session, SessionBuilder, SessionState};
