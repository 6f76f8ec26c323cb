//! Tokio driver for the Parlor session core.
//!
//! `parlor-core` is Sans-IO: it decides, this crate does. The driver owns
//! the WebSocket transport ([`transport`]), the matchmaking REST boundary
//! ([`MatchmakingApi`]), and the single actor task that feeds events into
//! the core and executes the actions it returns.
//!
//! # Architecture
//!
//! All session state lives on one task, so ordering is explicit and there
//! is nothing to lock.
//! [`ChatSession`] is a cheap cloneable handle: operations are commands over
//! an mpsc channel, state reads come back over oneshots, and change notices
//! fan out on a broadcast channel that any number of screens can watch.
//!
//! Credentials are pulled, never stored: every authenticated request asks
//! the [`CredentialProvider`] for the current bearer token.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod credentials;
mod error;
mod rest;
mod runtime;
pub mod transport;

pub use client::{ChatSession, ChatSessionConfig, StateSnapshot};
pub use credentials::{CredentialProvider, StaticCredentials};
pub use error::{ClientError, RestError, TransportError};
pub use parlor_core::{
    ConnectionConfig, ConnectionState, Message, MessageOrigin, PublishOutcome, QueueState,
    QueueStatus, SessionIdentity, SessionNotice,
};
pub use parlor_proto::{MemberId, RoomId};
pub use rest::MatchmakingApi;
