use axum::extract::ws::Message;
use serde::Deserialize;
use std::sync::Arc;

pub const RECEIVED: &str = "Location received successfully";

/// Query parameters accepted on the stream-open request.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Everything a session's writer may put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// An inbound location payload relayed verbatim.
    Relay(Arc<str>),
    /// A reply meant for the originating session only.
    Ack(Ack),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Received,
    Rejected(String),
}

impl Ack {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Ack::Received => serde_json::json!({ "message": RECEIVED }),
            Ack::Rejected(reason) => serde_json::json!({ "error": reason }),
        }
    }
}

impl Outbound {
    pub fn into_message(self) -> Message {
        match self {
            Outbound::Relay(payload) => Message::Text(payload.to_string().into()),
            Outbound::Ack(ack) => Message::Text(ack.to_json().to_string().into()),
        }
    }
}
