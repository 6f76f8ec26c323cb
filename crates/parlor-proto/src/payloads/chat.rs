//! Chat message envelopes for per-room topics.
//!
//! The two directions use different field names for the same concepts
//! (`nickname` out, `nickName` in; no id or timestamp out, server-assigned
//! `chatId`/`createdAt` in). This asymmetry is how the server actually
//! behaves; the message store translates both into one domain type.

use serde::{Deserialize, Serialize};

use crate::topic::{MemberId, RoomId};

/// Outbound chat publish, client to server.
///
/// Serialized shape:
/// `{ "message": .., "nickname": .., "memberId": .., "chatRoomId": .. }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPublish {
    /// Message text.
    pub message: String,
    /// Sender display name.
    pub nickname: String,
    /// Sender member id.
    pub member_id: MemberId,
    /// Destination room.
    pub chat_room_id: RoomId,
}

/// Inbound chat delivery, server to client.
///
/// Serialized shape:
/// `{ "chatId": .., "message": .., "nickName": .., "createdAt": ..,
///    "chatRoomId": .. }`
///
/// `created_at` is epoch milliseconds as stamped by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDelivery {
    /// Server-assigned message id.
    pub chat_id: u64,
    /// Message text.
    pub message: String,
    /// Sender display name.
    pub nick_name: String,
    /// Server-side send time, epoch milliseconds.
    pub created_at: u64,
    /// Room the message was published to.
    pub chat_room_id: RoomId,
}
