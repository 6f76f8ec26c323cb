//! Typed payload envelopes carried in frame bodies.
//!
//! Frame routing works on raw JSON bodies; these types give each topic its
//! concrete shape. Chat envelopes live in [`chat`], matchmaking envelopes in
//! [`queue`].
//!
//! # Invariants
//!
//! - Serialized field names are a server contract, pinned by tests. The
//!   inbound and outbound chat shapes differ on purpose ([`chat`] documents
//!   the divergence) and must not be "fixed" to agree.

pub mod chat;
pub mod queue;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::{ProtocolError, Result};

/// Decode a frame body into a typed payload, labeling errors with `context`.
pub fn from_body<T: DeserializeOwned>(context: &'static str, body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| ProtocolError::malformed(context, &e))
}
