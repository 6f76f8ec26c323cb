//! Subscription registry with durable intent.
//!
//! Topic subscriptions over the transport die with the connection, so the
//! registry keeps the *desired* set separately and replays it after every
//! successful (re)connect. Publishes issued while disconnected are parked in
//! a bounded deferred queue and flushed right after the replay, and every
//! publish reports an explicit [`PublishOutcome`]; nothing vanishes
//! silently.
//!
//! Frames to put on the wire accumulate internally; the session drains them
//! with [`SubscriptionRegistry::take_outgoing`] after each operation.

use std::collections::{BTreeSet, VecDeque};

use parlor_proto::{ClientFrame, Topic};
use serde_json::Value;

/// Maximum number of publishes parked while disconnected.
pub const DEFAULT_DEFERRED_CAPACITY: usize = 64;

/// Result of a publish attempt.
///
/// This reports the fate of the *publish attempt only*; the protocol has no
/// delivery acknowledgment, so `Sent` means "handed to the transport".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Frame emitted on the live connection.
    Sent,
    /// Connection down; payload parked for flush after the next reconnect.
    Deferred,
    /// Connection down and the deferred queue is full; payload discarded.
    Dropped,
}

/// Durable subscription intent plus deferred publishes.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    /// Topics the session wants delivered. BTreeSet for deterministic
    /// replay order.
    intents: BTreeSet<Topic>,
    /// Publishes parked while disconnected, oldest first.
    deferred: VecDeque<(Topic, Value)>,
    /// Frames waiting for the session to drain onto the wire.
    outgoing: Vec<ClientFrame>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a topic is currently wanted.
    #[must_use]
    pub fn is_subscribed(&self, topic: Topic) -> bool {
        self.intents.contains(&topic)
    }

    /// Record intent for a topic without emitting a frame.
    ///
    /// Used for service-default subscriptions that the replay pass will put
    /// on the wire.
    pub fn ensure(&mut self, topic: Topic) {
        self.intents.insert(topic);
    }

    /// Subscribe to a topic.
    ///
    /// The intent is durable either way; a SUBSCRIBE frame goes out only on
    /// a live connection and only if the topic was not already wanted.
    pub fn subscribe(&mut self, topic: Topic, connected: bool) {
        let newly_added = self.intents.insert(topic);
        if newly_added && connected {
            self.outgoing.push(ClientFrame::Subscribe { topic });
        }
        if newly_added && !connected {
            tracing::debug!(%topic, "subscription recorded for replay after reconnect");
        }
    }

    /// Unsubscribe from a topic.
    ///
    /// Removes the durable intent, discards any deferred publishes for the
    /// topic (in-flight work for an unwanted topic is dropped, by contract),
    /// and emits UNSUBSCRIBE when connected.
    pub fn unsubscribe(&mut self, topic: Topic, connected: bool) {
        let was_wanted = self.intents.remove(&topic);
        self.deferred.retain(|(t, _)| *t != topic);
        if was_wanted && connected {
            self.outgoing.push(ClientFrame::Unsubscribe { topic });
        }
    }

    /// Publish a payload to a topic, fire-and-forget.
    ///
    /// On a live connection the frame is emitted immediately; otherwise the
    /// payload is parked for flush after the next reconnect, if room
    /// remains.
    pub fn publish(&mut self, topic: Topic, body: Value, connected: bool) -> PublishOutcome {
        if connected {
            self.outgoing.push(ClientFrame::Send { topic, body });
            return PublishOutcome::Sent;
        }

        if self.deferred.len() >= DEFAULT_DEFERRED_CAPACITY {
            tracing::warn!(%topic, "deferred publish queue full, dropping payload");
            return PublishOutcome::Dropped;
        }

        self.deferred.push_back((topic, body));
        PublishOutcome::Deferred
    }

    /// Replay all durable intents and flush deferred publishes.
    ///
    /// Called on every transition to Connected. Subscriptions go out before
    /// the deferred payloads so nothing is published to a topic the server
    /// does not yet have us on.
    pub fn replay(&mut self) {
        for topic in &self.intents {
            self.outgoing.push(ClientFrame::Subscribe { topic: *topic });
        }

        let parked = self.deferred.len();
        if parked > 0 {
            tracing::info!(parked, "flushing deferred publishes after reconnect");
        }
        while let Some((topic, body)) = self.deferred.pop_front() {
            self.outgoing.push(ClientFrame::Send { topic, body });
        }
    }

    /// Drop all intents, emitting UNSUBSCRIBE frames when connected.
    pub fn clear(&mut self, connected: bool) {
        let topics: Vec<Topic> = self.intents.iter().copied().collect();
        for topic in topics {
            self.unsubscribe(topic, connected);
        }
        self.deferred.clear();
    }

    /// Number of publishes currently parked.
    #[must_use]
    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Take the frames accumulated by recent operations.
    pub fn take_outgoing(&mut self) -> Vec<ClientFrame> {
        std::mem::take(&mut self.outgoing)
    }
}

#[cfg(test)]
mod tests {
    use parlor_proto::RoomId;
    use serde_json::json;

    use super::*;

    #[test]
    fn subscribe_connected_emits_frame() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe(Topic::QueueStatus, true);

        assert_eq!(registry.take_outgoing(), vec![ClientFrame::Subscribe {
            topic: Topic::QueueStatus
        }]);
        assert!(registry.is_subscribed(Topic::QueueStatus));
    }

    #[test]
    fn subscribe_disconnected_records_intent_only() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe(Topic::Room(RoomId(1)), false);

        assert!(registry.take_outgoing().is_empty());
        assert!(registry.is_subscribed(Topic::Room(RoomId(1))));
    }

    #[test]
    fn duplicate_subscribe_emits_nothing() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe(Topic::QueueStatus, true);
        let _ = registry.take_outgoing();

        registry.subscribe(Topic::QueueStatus, true);
        assert!(registry.take_outgoing().is_empty());
    }

    #[test]
    fn replay_emits_every_intent() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe(Topic::Room(RoomId(2)), false);
        registry.ensure(Topic::QueueStatus);
        let _ = registry.take_outgoing();

        registry.replay();
        let frames = registry.take_outgoing();
        // BTreeSet order: QueueStatus sorts before rooms.
        assert_eq!(frames, vec![
            ClientFrame::Subscribe { topic: Topic::QueueStatus },
            ClientFrame::Subscribe { topic: Topic::Room(RoomId(2)) },
        ]);
    }

    #[test]
    fn offline_publish_defers_and_flushes_after_replay() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe(Topic::Room(RoomId(1)), false);

        let outcome = registry.publish(Topic::Room(RoomId(1)), json!({"n": 1}), false);
        assert_eq!(outcome, PublishOutcome::Deferred);
        assert_eq!(registry.deferred_len(), 1);
        let _ = registry.take_outgoing();

        registry.replay();
        let frames = registry.take_outgoing();
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], ClientFrame::Subscribe { .. }));
        assert!(matches!(frames[1], ClientFrame::Send { .. }));
        assert_eq!(registry.deferred_len(), 0);
    }

    #[test]
    fn deferred_queue_is_bounded() {
        let mut registry = SubscriptionRegistry::new();
        for i in 0..DEFAULT_DEFERRED_CAPACITY {
            let outcome =
                registry.publish(Topic::Room(RoomId(1)), json!({ "n": i }), false);
            assert_eq!(outcome, PublishOutcome::Deferred);
        }

        let overflow = registry.publish(Topic::Room(RoomId(1)), json!({"n": -1}), false);
        assert_eq!(overflow, PublishOutcome::Dropped);
        assert_eq!(registry.deferred_len(), DEFAULT_DEFERRED_CAPACITY);
    }

    #[test]
    fn unsubscribe_drops_parked_publishes_for_topic() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe(Topic::Room(RoomId(1)), false);
        registry.subscribe(Topic::Room(RoomId(2)), false);
        let _ = registry.publish(Topic::Room(RoomId(1)), json!({"a": 1}), false);
        let _ = registry.publish(Topic::Room(RoomId(2)), json!({"b": 2}), false);

        registry.unsubscribe(Topic::Room(RoomId(1)), false);
        assert_eq!(registry.deferred_len(), 1);
        assert!(!registry.is_subscribed(Topic::Room(RoomId(1))));
        assert!(registry.is_subscribed(Topic::Room(RoomId(2))));
    }

    #[test]
    fn unsubscribe_connected_emits_frame_once() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe(Topic::QueueStatus, true);
        let _ = registry.take_outgoing();

        registry.unsubscribe(Topic::QueueStatus, true);
        assert_eq!(registry.take_outgoing(), vec![ClientFrame::Unsubscribe {
            topic: Topic::QueueStatus
        }]);

        // Not wanted anymore: no second frame.
        registry.unsubscribe(Topic::QueueStatus, true);
        assert!(registry.take_outgoing().is_empty());
    }

    #[test]
    fn clear_unsubscribes_everything() {
        let mut registry = SubscriptionRegistry::new();
        registry.subscribe(Topic::QueueStatus, true);
        registry.subscribe(Topic::Room(RoomId(1)), true);
        let _ = registry.take_outgoing();

        registry.clear(true);
        let frames = registry.take_outgoing();
        assert_eq!(frames.len(), 2);
        assert!(!registry.is_subscribed(Topic::QueueStatus));
        assert_eq!(registry.deferred_len(), 0);
    }
}
