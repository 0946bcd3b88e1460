//! Frame codec: raw text frames to protocol envelopes and back.
//!
//! Every gateway frame is a JSON object `{op, e?, d?}`. `op` classifies the
//! frame; data frames additionally carry an event tag `e` and payload `d`.

use crate::error::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Operation codes.
pub mod op {
    /// Data frame carrying `e` and `d`.
    pub const EVENT: u32 = 0;
    /// Server hello, carries `hbt_int`.
    pub const HELLO: u32 = 1;
    /// Client authentication.
    pub const IDENTIFY: u32 = 2;
    /// Client keep-alive.
    pub const HEARTBEAT: u32 = 3;
}

/// One decoded protocol unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Operation code.
    pub op: u32,

    /// Event tag, present on data frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct HelloPayload {
    hbt_int: u64,
}

impl Envelope {
    /// The authentication envelope `{op:2, d:{token}}`.
    pub fn identify(token: &str) -> Self {
        Self {
            op: op::IDENTIFY,
            e: None,
            d: Some(json!({ "token": token })),
        }
    }

    /// The keep-alive envelope `{op:3}`.
    pub fn heartbeat() -> Self {
        Self {
            op: op::HEARTBEAT,
            e: None,
            d: None,
        }
    }

    /// A server hello announcing a heartbeat interval.
    pub fn hello(interval_ms: u64) -> Self {
        Self {
            op: op::HELLO,
            e: None,
            d: Some(json!({ "hbt_int": interval_ms })),
        }
    }

    /// A data frame.
    pub fn event(tag: impl Into<String>, data: Value) -> Self {
        Self {
            op: op::EVENT,
            e: Some(tag.into()),
            d: Some(data),
        }
    }

    /// Heartbeat interval announced by a `HELLO` envelope, in milliseconds.
    ///
    /// A zero interval is malformed.
    pub fn hello_interval(&self) -> Result<u64> {
        let data = self
            .d
            .as_ref()
            .ok_or_else(|| GatewayError::malformed("HELLO without payload"))?;
        let hello = HelloPayload::deserialize(data)
            .map_err(|e| GatewayError::malformed(format!("HELLO payload: {}", e)))?;
        if hello.hbt_int == 0 {
            return Err(GatewayError::malformed("HELLO heartbeat interval is zero"));
        }
        Ok(hello.hbt_int)
    }
}

/// Decode a raw text frame.
pub fn decode(raw: &str) -> Result<Envelope> {
    serde_json::from_str(raw).map_err(|e| GatewayError::malformed(e.to_string()))
}

/// Encode an envelope as a raw text frame.
pub fn encode(envelope: &Envelope) -> Result<String> {
    serde_json::to_string(envelope).map_err(|e| GatewayError::malformed(e.to_string()))
}

/// Decode a transport message. Only text frames are interpreted; every other
/// kind yields `Ok(None)`.
pub fn decode_message(message: &WsMessage) -> Result<Option<Envelope>> {
    match message {
        WsMessage::Text(text) => decode(text).map(Some),
        _ => Ok(None),
    }
}

/// Wrap an envelope in a transport text message.
pub fn encode_message(envelope: &Envelope) -> Result<WsMessage> {
    encode(envelope).map(WsMessage::Text)
}
