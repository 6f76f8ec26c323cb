//! Per-room message state with optimistic sends and echo reconciliation.
//!
//! Sends are optimistic: the message lands in the room's sequence
//! synchronously, before any network activity, under a client-local id. When
//! the server later echoes the message back (the service redelivers every
//! publish to all subscribers, sender included), the echo must not create a
//! duplicate: it is matched against the oldest pending local message and
//! merged in place, or suppressed when no pending copy matches.
//!
//! The wire cannot round-trip a client correlation id (the inbound envelope
//! is fixed), so echo detection is by sender identity, refined by body
//! equality for the merge.
//!
//! # Invariants
//!
//! - A room's sequence always reflects insertion order as observed here;
//!   merging an echo never moves the message.
//! - Local ids are strictly monotonic: same-millisecond sends are
//!   disambiguated by a sequence counter, and a wall clock that jumps
//!   backwards is clamped.
//! - An echo never grows the sequence.

use std::collections::HashMap;

use parlor_proto::{RoomId, payloads::chat::ChatDelivery};

/// Where a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Inserted optimistically on send; not yet confirmed by the server.
    LocalPending,
    /// Delivered (or confirmed) by the server.
    RemoteConfirmed,
}

/// Message identifier.
///
/// Local ids exist only until the server's echo confirms the message (or
/// forever, if it never does); server ids are authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Client-temporary id assigned at send time.
    Local {
        /// Send time, epoch milliseconds, clamped monotonic.
        at_millis: u64,
        /// Disambiguates sends within one millisecond.
        seq: u32,
    },
    /// Server-assigned id from the inbound envelope.
    Server(u64),
}

/// A single chat message as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Identifier; local until confirmed.
    pub id: MessageId,
    /// Room the message belongs to.
    pub room_id: RoomId,
    /// Sender display name.
    pub sender: String,
    /// Message text.
    pub body: String,
    /// Send time, epoch milliseconds (server time once confirmed).
    pub sent_at_millis: u64,
    /// Provenance.
    pub origin: MessageOrigin,
}

/// What happened to an inbound delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Appended to the room's sequence.
    Appended,
    /// Echo of an optimistic send: merged into the pending copy in place.
    Merged,
    /// Echo with no matching pending copy: dropped.
    Suppressed,
    /// Delivery for a room this store does not own: dropped.
    UnknownRoom,
}

/// Per-room state owned by the store.
#[derive(Debug, Clone)]
struct Room {
    messages: Vec<Message>,
    participant_count: u32,
}

/// Holds every room's ordered message sequence.
///
/// The store is the only writer of room state; the connection and queue
/// machinery never touch message sequences directly.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    rooms: HashMap<RoomId, Room>,
    /// Millisecond component of the last local id handed out.
    last_local_millis: u64,
    /// Sequence within `last_local_millis`.
    local_seq: u32,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room entry. Idempotent; an existing room keeps its messages
    /// (an offline send may have created it already) and only updates the
    /// participant count.
    pub fn join_room(&mut self, room_id: RoomId, participant_count: u32) {
        self.rooms
            .entry(room_id)
            .and_modify(|room| room.participant_count = participant_count)
            .or_insert(Room { messages: Vec::new(), participant_count });
    }

    /// Discard a room and its messages. Returns whether the room existed.
    pub fn leave_room(&mut self, room_id: RoomId) -> bool {
        self.rooms.remove(&room_id).is_some()
    }

    /// Whether the store owns a room.
    #[must_use]
    pub fn contains_room(&self, room_id: RoomId) -> bool {
        self.rooms.contains_key(&room_id)
    }

    /// Ids of all rooms currently owned.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }

    /// Participant count for a room, if owned.
    #[must_use]
    pub fn participant_count(&self, room_id: RoomId) -> Option<u32> {
        self.rooms.get(&room_id).map(|room| room.participant_count)
    }

    /// Ordered messages for a room; empty for unknown rooms.
    #[must_use]
    pub fn messages(&self, room_id: RoomId) -> &[Message] {
        self.rooms.get(&room_id).map_or(&[], |room| room.messages.as_slice())
    }

    /// Insert an optimistic local message, synchronously.
    ///
    /// Creates the room entry if needed so a send to a room the user is
    /// still entering (or a send while offline) is never lost. Returns the
    /// client-local id.
    pub fn insert_local(
        &mut self,
        room_id: RoomId,
        sender: &str,
        body: &str,
        at_millis: u64,
    ) -> MessageId {
        let id = self.next_local_id(at_millis);
        let message = Message {
            id,
            room_id,
            sender: sender.to_string(),
            body: body.to_string(),
            sent_at_millis: self.last_local_millis,
            origin: MessageOrigin::LocalPending,
        };

        self.rooms
            .entry(room_id)
            .or_insert(Room { messages: Vec::new(), participant_count: 0 })
            .messages
            .push(message);
        id
    }

    /// Reconcile an inbound delivery against the room's sequence.
    ///
    /// A delivery whose sender matches `self_nickname` is the server's echo
    /// of an optimistic send: the oldest pending message with the same body
    /// adopts the server id and timestamp in place (its position does not
    /// change), and if none matches the echo is dropped. Other senders are
    /// appended in arrival order.
    pub fn apply_remote(&mut self, delivery: &ChatDelivery, self_nickname: &str) -> RemoteOutcome {
        let Some(room) = self.rooms.get_mut(&delivery.chat_room_id) else {
            return RemoteOutcome::UnknownRoom;
        };

        if delivery.nick_name == self_nickname {
            let pending = room.messages.iter_mut().find(|m| {
                m.origin == MessageOrigin::LocalPending && m.body == delivery.message
            });

            return match pending {
                Some(message) => {
                    message.id = MessageId::Server(delivery.chat_id);
                    message.sent_at_millis = delivery.created_at;
                    message.origin = MessageOrigin::RemoteConfirmed;
                    RemoteOutcome::Merged
                },
                None => {
                    tracing::debug!(
                        room_id = %delivery.chat_room_id,
                        chat_id = delivery.chat_id,
                        "suppressed own echo with no pending copy"
                    );
                    RemoteOutcome::Suppressed
                },
            };
        }

        room.messages.push(Message {
            id: MessageId::Server(delivery.chat_id),
            room_id: delivery.chat_room_id,
            sender: delivery.nick_name.clone(),
            body: delivery.message.clone(),
            sent_at_millis: delivery.created_at,
            origin: MessageOrigin::RemoteConfirmed,
        });
        RemoteOutcome::Appended
    }

    /// Drop every room.
    pub fn clear(&mut self) {
        self.rooms.clear();
    }

    /// Next local id: monotonic millis, with a sequence counter for sends
    /// that share a millisecond tick.
    fn next_local_id(&mut self, at_millis: u64) -> MessageId {
        // Clamp so a wall clock stepping backwards cannot break id ordering.
        let at_millis = at_millis.max(self.last_local_millis);

        if at_millis == self.last_local_millis {
            self.local_seq += 1;
        } else {
            self.last_local_millis = at_millis;
            self.local_seq = 0;
        }

        MessageId::Local { at_millis: self.last_local_millis, seq: self.local_seq }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ME: &str = "ash";

    fn delivery(room: u64, chat_id: u64, nick: &str, body: &str, at: u64) -> ChatDelivery {
        ChatDelivery {
            chat_id,
            message: body.to_string(),
            nick_name: nick.to_string(),
            created_at: at,
            chat_room_id: RoomId(room),
        }
    }

    #[test]
    fn insert_local_grows_sequence_by_one_synchronously() {
        let mut store = MessageStore::new();

        for i in 0..5 {
            let _ = store.insert_local(RoomId(42), ME, "hello", 1_000 + i);
            assert_eq!(store.messages(RoomId(42)).len(), (i + 1) as usize);
        }
    }

    #[test]
    fn insert_local_is_pending_with_local_id() {
        let mut store = MessageStore::new();
        let id = store.insert_local(RoomId(42), ME, "hello", 1_000);

        let messages = store.messages(RoomId(42));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, id);
        assert_eq!(messages[0].origin, MessageOrigin::LocalPending);
        assert!(matches!(id, MessageId::Local { at_millis: 1_000, seq: 0 }));
    }

    #[test]
    fn same_tick_sends_get_distinct_ids() {
        let mut store = MessageStore::new();
        let a = store.insert_local(RoomId(1), ME, "one", 1_000);
        let b = store.insert_local(RoomId(1), ME, "two", 1_000);
        let c = store.insert_local(RoomId(1), ME, "three", 1_000);

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(b, MessageId::Local { at_millis: 1_000, seq: 1 });
        assert_eq!(c, MessageId::Local { at_millis: 1_000, seq: 2 });
    }

    #[test]
    fn clock_regression_does_not_reuse_ids() {
        let mut store = MessageStore::new();
        let a = store.insert_local(RoomId(1), ME, "one", 2_000);
        let b = store.insert_local(RoomId(1), ME, "two", 1_500);

        assert_ne!(a, b);
        assert_eq!(b, MessageId::Local { at_millis: 2_000, seq: 1 });
    }

    #[test]
    fn echo_merges_into_pending_copy_in_place() {
        let mut store = MessageStore::new();
        store.join_room(RoomId(42), 2);
        let _ = store.insert_local(RoomId(42), ME, "hello", 1_000);
        let outcome = store.apply_remote(&delivery(42, 900, ME, "hello", 1_234), ME);

        assert_eq!(outcome, RemoteOutcome::Merged);
        let messages = store.messages(RoomId(42));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, MessageId::Server(900));
        assert_eq!(messages[0].sent_at_millis, 1_234);
        assert_eq!(messages[0].origin, MessageOrigin::RemoteConfirmed);
    }

    #[test]
    fn echo_without_pending_copy_is_suppressed() {
        let mut store = MessageStore::new();
        store.join_room(RoomId(42), 2);
        let outcome = store.apply_remote(&delivery(42, 900, ME, "hello", 1_234), ME);

        assert_eq!(outcome, RemoteOutcome::Suppressed);
        assert!(store.messages(RoomId(42)).is_empty());
    }

    #[test]
    fn echo_never_grows_the_sequence() {
        let mut store = MessageStore::new();
        store.join_room(RoomId(42), 2);
        let _ = store.insert_local(RoomId(42), ME, "hello", 1_000);

        let _ = store.apply_remote(&delivery(42, 900, ME, "hello", 1_100), ME);
        let _ = store.apply_remote(&delivery(42, 901, ME, "hello", 1_200), ME);
        assert_eq!(store.messages(RoomId(42)).len(), 1);
    }

    #[test]
    fn merged_echo_keeps_position_ahead_of_later_remotes() {
        let mut store = MessageStore::new();
        store.join_room(RoomId(42), 2);
        let _ = store.insert_local(RoomId(42), ME, "mine", 1_000);
        let _ = store.apply_remote(&delivery(42, 1, "birch", "theirs", 1_001), ME);
        // Echo arrives after the other sender's message; the merged copy must
        // stay first even though its server timestamp is later.
        let _ = store.apply_remote(&delivery(42, 2, ME, "mine", 1_002), ME);

        let messages = store.messages(RoomId(42));
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "mine");
        assert_eq!(messages[0].id, MessageId::Server(2));
        assert_eq!(messages[1].body, "theirs");
    }

    #[test]
    fn distinct_remote_senders_keep_arrival_order() {
        let mut store = MessageStore::new();
        store.join_room(RoomId(42), 3);
        let _ = store.apply_remote(&delivery(42, 1, "birch", "first", 1_000), ME);
        let _ = store.apply_remote(&delivery(42, 2, "cedar", "second", 1_001), ME);

        let messages = store.messages(RoomId(42));
        assert_eq!(messages[0].sender, "birch");
        assert_eq!(messages[1].sender, "cedar");
        assert!(messages.iter().all(|m| m.origin == MessageOrigin::RemoteConfirmed));
    }

    #[test]
    fn echo_matches_oldest_pending_first() {
        let mut store = MessageStore::new();
        store.join_room(RoomId(42), 2);
        let first = store.insert_local(RoomId(42), ME, "hi", 1_000);
        let _second = store.insert_local(RoomId(42), ME, "hi", 1_000);

        let _ = store.apply_remote(&delivery(42, 900, ME, "hi", 1_050), ME);

        let messages = store.messages(RoomId(42));
        assert_eq!(messages[0].id, MessageId::Server(900));
        assert_ne!(messages[0].id, first);
        assert_eq!(messages[1].origin, MessageOrigin::LocalPending);
    }

    #[test]
    fn delivery_for_unknown_room_is_dropped() {
        let mut store = MessageStore::new();
        let outcome = store.apply_remote(&delivery(99, 1, "birch", "hi", 1_000), ME);

        assert_eq!(outcome, RemoteOutcome::UnknownRoom);
        assert!(store.messages(RoomId(99)).is_empty());
    }

    #[test]
    fn messages_for_unknown_room_is_empty() {
        let store = MessageStore::new();
        assert!(store.messages(RoomId(7)).is_empty());
    }

    #[test]
    fn join_room_is_idempotent_and_keeps_offline_sends() {
        let mut store = MessageStore::new();
        let _ = store.insert_local(RoomId(42), ME, "early", 1_000);

        store.join_room(RoomId(42), 2);
        assert_eq!(store.messages(RoomId(42)).len(), 1);
        assert_eq!(store.participant_count(RoomId(42)), Some(2));
    }

    #[test]
    fn room_ids_reports_owned_rooms() {
        let mut store = MessageStore::new();
        store.join_room(RoomId(1), 2);
        store.join_room(RoomId(2), 2);

        let mut ids = store.room_ids();
        ids.sort_unstable();
        assert_eq!(ids, vec![RoomId(1), RoomId(2)]);
    }

    #[test]
    fn leave_room_discards_messages() {
        let mut store = MessageStore::new();
        store.join_room(RoomId(42), 2);
        let _ = store.insert_local(RoomId(42), ME, "hello", 1_000);

        assert!(store.leave_room(RoomId(42)));
        assert!(!store.contains_room(RoomId(42)));
        assert!(store.messages(RoomId(42)).is_empty());
        assert!(!store.leave_room(RoomId(42)));
    }
}
