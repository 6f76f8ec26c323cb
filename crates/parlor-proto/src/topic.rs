//! Identity newtypes and the topic taxonomy.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::errors::ProtocolError;

/// Unique identifier for a chat room.
///
/// Room ids are assigned by the matchmaking service and arrive in `MATCHED`
/// queue events. The wire representation is a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room-{}", self.0)
    }
}

/// Stable identifier for a service member.
///
/// Carried in the outbound chat envelope so the server can attribute
/// messages; the inbound envelope identifies senders by display name only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "member-{}", self.0)
    }
}

/// A named pub/sub channel multiplexed over the persistent connection.
///
/// The taxonomy is fixed: one well-known matchmaking-status topic, and one
/// chat topic per room. Topics serialize as their path string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    /// Matchmaking queue updates (`QUEUE_STATUS` / `MATCHED` events).
    QueueStatus,
    /// Chat messages for a single room.
    Room(RoomId),
}

/// Path of the well-known matchmaking-status topic.
const QUEUE_TOPIC: &str = "/topic/queue";

/// Path prefix for per-room chat topics.
const ROOM_TOPIC_PREFIX: &str = "/topic/room/";

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueStatus => f.write_str(QUEUE_TOPIC),
            Self::Room(room_id) => write!(f, "{ROOM_TOPIC_PREFIX}{}", room_id.0),
        }
    }
}

impl FromStr for Topic {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == QUEUE_TOPIC {
            return Ok(Self::QueueStatus);
        }
        if let Some(raw_id) = s.strip_prefix(ROOM_TOPIC_PREFIX)
            && let Ok(id) = raw_id.parse::<u64>()
        {
            return Ok(Self::Room(RoomId(id)));
        }
        Err(ProtocolError::UnknownTopic { topic: s.to_string() })
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&RoomId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn member_id_round_trip() {
        let id: MemberId = serde_json::from_str("7").unwrap();
        assert_eq!(id, MemberId(7));
    }

    #[test]
    fn queue_topic_path() {
        assert_eq!(Topic::QueueStatus.to_string(), "/topic/queue");
        assert_eq!("/topic/queue".parse::<Topic>().unwrap(), Topic::QueueStatus);
    }

    #[test]
    fn room_topic_path_round_trips() {
        let topic = Topic::Room(RoomId(42));
        assert_eq!(topic.to_string(), "/topic/room/42");
        assert_eq!("/topic/room/42".parse::<Topic>().unwrap(), topic);
    }

    #[test]
    fn unknown_topic_rejected() {
        let result = "/topic/presence".parse::<Topic>();
        assert!(matches!(result, Err(ProtocolError::UnknownTopic { .. })));
    }

    #[test]
    fn room_topic_with_garbage_id_rejected() {
        assert!("/topic/room/abc".parse::<Topic>().is_err());
        assert!("/topic/room/".parse::<Topic>().is_err());
    }

    #[test]
    fn topic_serializes_as_path_string() {
        let json = serde_json::to_string(&Topic::Room(RoomId(3))).unwrap();
        assert_eq!(json, "\"/topic/room/3\"");
    }
}
