//! Error types for the session core.
//!
//! Only business-logic failures become typed errors surfaced to the caller.
//! Network-layer failures are recovered locally (the connection machine
//! retries), and malformed inbound payloads are logged and dropped at the
//! dispatch layer; neither ever reaches the presentation layer as an error.

use thiserror::Error;

use crate::queue::QueueState;

/// Errors from matchmaking operations.
///
/// These are surfaced synchronously so the presentation layer can message
/// the user; the state machine itself is left untouched by a failed call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Operation is not valid in the current queue state.
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        /// State at the time of the call.
        state: QueueState,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// A request for this operation is already in flight.
    #[error("{operation} request already pending")]
    RequestPending {
        /// Operation that was attempted.
        operation: &'static str,
    },
}
