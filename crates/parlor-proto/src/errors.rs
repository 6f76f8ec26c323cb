//! Error types for wire protocol encoding and decoding.

use thiserror::Error;

/// Convenience alias for protocol results.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire frames.
///
/// Decode errors are expected in normal operation (a misbehaving server, a
/// truncated frame) and must never crash the dispatch loop; callers log and
/// drop the offending frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame or payload JSON did not parse into the expected shape.
    #[error("malformed {context}: {reason}")]
    Malformed {
        /// What was being decoded ("frame", "chat body", ...).
        context: &'static str,
        /// Underlying serde error, stringified.
        reason: String,
    },

    /// A topic string did not match any known taxonomy entry.
    #[error("unknown topic: {topic}")]
    UnknownTopic {
        /// The offending topic string.
        topic: String,
    },
}

impl ProtocolError {
    /// Wrap a serde error with the decode context it occurred in.
    pub fn malformed(context: &'static str, err: &serde_json::Error) -> Self {
        Self::Malformed { context, reason: err.to_string() }
    }
}
