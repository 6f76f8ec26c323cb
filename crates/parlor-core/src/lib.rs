//! Session core for the Parlor chat client.
//!
//! This crate is the real-time heart of the client: the one persistent
//! connection, the per-topic subscriptions multiplexed over it, the per-room
//! message state with optimistic sends, and the matchmaking queue state
//! machine. Screens and navigation live elsewhere and only ever call the
//! public operations here and render the state they expose.
//!
//! # Architecture
//!
//! Everything is Sans-IO. The state machines never touch a socket or a
//! clock; they consume events, mutate owned state, and return
//! [`SessionAction`]s for a driver (see `parlor-client`) to execute. Time
//! comes in through the [`env::Environment`] abstraction so every test runs
//! deterministically.
//!
//! # Components
//!
//! - [`ConnectionManager`]: connection lifecycle and fixed-delay reconnect
//! - [`SubscriptionRegistry`]: durable topic intent, replayed after every
//!   (re)connect, plus deferred publishes while offline
//! - [`MessageStore`]: per-room ordered messages, optimistic insertion, and
//!   echo reconciliation
//! - [`QueueCoordinator`]: the Idle → Queued → Matched → InRoom machine
//! - [`Session`]: composition root and inbound-frame dispatcher

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod connection;
pub mod env;
mod error;
mod event;
mod queue;
mod registry;
mod session;
mod store;

pub use connection::{
    ConnectionAction, ConnectionConfig, ConnectionManager, ConnectionState,
    DEFAULT_RECONNECT_DELAY,
};
pub use error::QueueError;
pub use event::{SessionAction, SessionEvent, SessionNotice};
pub use parlor_proto::{MemberId, RoomId, Topic, payloads::queue::QueueStatus};
pub use queue::{QueueCoordinator, QueueSignal, QueueState};
pub use registry::{DEFAULT_DEFERRED_CAPACITY, PublishOutcome, SubscriptionRegistry};
pub use session::{Session, SessionIdentity};
pub use store::{Message, MessageId, MessageOrigin, MessageStore, RemoteOutcome};
