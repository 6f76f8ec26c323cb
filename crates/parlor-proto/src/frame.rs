//! Frame types for the WebSocket text sub-protocol.
//!
//! Every WebSocket text frame carries exactly one JSON object tagged with a
//! `type` field. Frames are directional: [`ClientFrame`] travels client to
//! server, [`ServerFrame`] server to client.
//!
//! Frame bodies are held as raw [`serde_json::Value`] here. Routing only
//! needs the topic; decoding the body into a typed payload happens at the
//! dispatch layer, so one bad body never poisons frame-level parsing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    errors::{ProtocolError, Result},
    topic::Topic,
};

/// A frame sent from the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientFrame {
    /// Open a subscription to a topic.
    Subscribe {
        /// Topic to receive deliveries for.
        topic: Topic,
    },

    /// Close a subscription to a topic.
    Unsubscribe {
        /// Topic to stop receiving deliveries for.
        topic: Topic,
    },

    /// Publish a payload to a topic. Fire-and-forget: the server sends no
    /// per-publish acknowledgment.
    Send {
        /// Topic to publish to.
        topic: Topic,
        /// Payload, already serialized to JSON.
        body: Value,
    },
}

impl ClientFrame {
    /// Encode this frame as a WebSocket text payload.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::malformed("client frame", &e))
    }
}

/// A frame delivered from the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerFrame {
    /// A payload published to a topic this client is subscribed to.
    Message {
        /// Topic the payload was published to.
        topic: Topic,
        /// Payload, decoded no further than raw JSON.
        body: Value,
    },
}

impl ServerFrame {
    /// Decode a WebSocket text payload into a frame.
    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| ProtocolError::malformed("server frame", &e))
    }
}
