//! Error types for the driver layer.

use thiserror::Error;

/// Transport-level failures.
///
/// These never surface to the presentation layer as typed errors: a failed
/// dial or a dropped socket feeds the core's reconnect loop, and callers
/// observe `ConnectionState` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Dial failed before the WebSocket was established.
    #[error("connect failed: {0}")]
    Connect(String),

    /// The socket failed mid-stream.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Matchmaking REST failures, surfaced synchronously to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestError {
    /// The credential provider had no bearer token (signed out).
    #[error("no bearer token available")]
    MissingToken,

    /// The request never completed (DNS, refused, timeout).
    #[error("request failed: {0}")]
    Http(String),

    /// The service answered with a non-success status.
    #[error("request rejected with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },
}

/// Errors returned by [`crate::ChatSession`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The operation is invalid in the current queue state.
    #[error(transparent)]
    Queue(#[from] parlor_core::QueueError),

    /// The matchmaking REST call failed; queue state is unchanged.
    #[error(transparent)]
    Rest(#[from] RestError),

    /// The session actor task is gone (stopped or crashed).
    #[error("session is closed")]
    SessionClosed,
}
