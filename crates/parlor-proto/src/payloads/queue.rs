//! Matchmaking queue envelopes for the queue-status topic.

use serde::{Deserialize, Serialize};

use crate::topic::RoomId;

/// Snapshot of the matchmaking queue, replaced wholesale on every push.
///
/// There are no merge semantics: each `QUEUE_STATUS` event carries the full
/// current view and overwrites the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    /// Display names of members currently waiting.
    pub participant_list: Vec<String>,
    /// Server's wait estimate, seconds.
    pub estimated_wait_seconds: u64,
}

/// An event pushed on the queue-status topic.
///
/// The `type` field discriminates; dispatch happens on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueEvent {
    /// Periodic queue snapshot while waiting.
    QueueStatus(QueueStatus),

    /// A match was found; the client should move into the room.
    #[serde(rename_all = "camelCase")]
    Matched {
        /// Room the matched members were placed into.
        chat_room_id: RoomId,
    },
}
