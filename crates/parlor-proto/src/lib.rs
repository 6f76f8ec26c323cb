//! Wire protocol for the Parlor chat service.
//!
//! The server speaks a small text sub-protocol over one persistent WebSocket
//! connection: every WebSocket text frame is a JSON object tagged with a
//! `type` field. Clients subscribe to named topics and publish payloads to
//! them; the server delivers payloads as `MESSAGE` frames carrying the topic
//! they were published to.
//!
//! This crate is pure data plus serde. It knows nothing about sockets,
//! retries, or session state; see `parlor-core` for the state machines and
//! `parlor-client` for the I/O driver.
//!
//! # Invariants
//!
//! - Frame JSON shapes are part of the server contract and are pinned by
//!   tests, field name by field name.
//! - The outbound and inbound chat envelopes intentionally disagree on field
//!   naming (`nickname` vs `nickName`); translation into a single domain type
//!   happens above this crate, never here.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod errors;
mod frame;
pub mod payloads;
mod topic;

pub use errors::{ProtocolError, Result};
pub use frame::{ClientFrame, ServerFrame};
pub use topic::{MemberId, RoomId, Topic};
