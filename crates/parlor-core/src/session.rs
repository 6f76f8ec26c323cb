//! Session composition root and inbound dispatcher.
//!
//! [`Session`] owns the four core components and wires them together: the
//! connection machine decides when the registry replays, the registry
//! decides what goes on the wire, inbound frames are routed by topic to the
//! queue coordinator or the message store, and every externally visible
//! change is emitted as a [`SessionNotice`] action.
//!
//! One session instance exists per signed-in user, owned by the driver's
//! single event-loop task. There is no global connection object and no
//! "latest callback" slot: any number of presentation components can watch
//! the notice stream while the topic dispatch stays inside this type.
//!
//! # Responsibilities
//!
//! - Sequence cross-component effects (connect ⇒ replay, match ⇒
//!   unsubscribe, room leave ⇒ teardown).
//! - Decode frame bodies at the edge; malformed payloads are logged and
//!   dropped, never retried, and never crash the dispatch path.
//! - Expose the read surface the presentation layer renders from.

use parlor_proto::{
    MemberId, RoomId, ServerFrame, Topic,
    payloads::{self, chat::ChatDelivery, chat::ChatPublish, queue::QueueEvent, queue::QueueStatus},
};

use crate::{
    connection::{ConnectionConfig, ConnectionManager, ConnectionState},
    env::{Environment, SystemEnv},
    error::QueueError,
    event::{SessionAction, SessionEvent, SessionNotice},
    queue::{QueueCoordinator, QueueSignal, QueueState},
    registry::{PublishOutcome, SubscriptionRegistry},
    store::{MessageStore, RemoteOutcome},
};

/// Who this session is acting as.
///
/// Supplied by the external credential provider at session start; the core
/// never persists credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Stable member id, carried in outbound chat envelopes.
    pub member_id: MemberId,
    /// Display name. Also the echo-detection identity, since the inbound
    /// envelope identifies senders by name only.
    pub nickname: String,
}

/// The session core: one connection, one queue journey, any number of
/// watched rooms.
pub struct Session<E: Environment = SystemEnv> {
    env: E,
    identity: SessionIdentity,
    connection: ConnectionManager<E::Instant>,
    registry: SubscriptionRegistry,
    store: MessageStore,
    queue: QueueCoordinator,
}

impl<E: Environment> Session<E> {
    /// Create a session for the given identity.
    pub fn new(env: E, identity: SessionIdentity, config: ConnectionConfig) -> Self {
        Self {
            env,
            identity,
            connection: ConnectionManager::new(config),
            registry: SubscriptionRegistry::new(),
            store: MessageStore::new(),
            queue: QueueCoordinator::new(),
        }
    }

    // -- Read surface ------------------------------------------------------

    /// Identity this session acts as.
    #[must_use]
    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Current queue state.
    #[must_use]
    pub fn queue_state(&self) -> QueueState {
        self.queue.state()
    }

    /// Latest queue snapshot. `None` unless Queued.
    #[must_use]
    pub fn queue_status(&self) -> Option<&QueueStatus> {
        self.queue.status()
    }

    /// Ordered messages for a room; empty for unknown rooms. Safe to call
    /// at any time.
    #[must_use]
    pub fn messages(&self, room_id: RoomId) -> &[crate::store::Message] {
        self.store.messages(room_id)
    }

    /// Participant count for a room, if owned.
    #[must_use]
    pub fn participant_count(&self, room_id: RoomId) -> Option<u32> {
        self.store.participant_count(room_id)
    }

    // -- User intents ------------------------------------------------------

    /// Request a connection. Idempotent while one is already live or being
    /// dialed.
    pub fn connect(&mut self) -> Vec<SessionAction> {
        let before = self.connection.state();
        let mut actions = map_connection_actions(self.connection.request_connect());
        self.notice_connection_change(before, &mut actions);
        actions
    }

    /// Tear the connection down. Safe from any state; cancels reconnects.
    pub fn disconnect(&mut self) -> Vec<SessionAction> {
        let before = self.connection.state();
        let mut actions = map_connection_actions(self.connection.request_disconnect());
        self.notice_connection_change(before, &mut actions);
        actions
    }

    /// Send a chat message to a room.
    ///
    /// The message is inserted optimistically before any network activity;
    /// the returned [`PublishOutcome`] reports the publish attempt only,
    /// never delivery.
    pub fn send_chat(&mut self, room_id: RoomId, body: &str) -> (PublishOutcome, Vec<SessionAction>) {
        let at_millis = self.env.unix_millis();
        let _ = self.store.insert_local(room_id, &self.identity.nickname, body, at_millis);

        let mut actions = vec![SessionAction::Notify(SessionNotice::RoomUpdated { room_id })];

        let envelope = ChatPublish {
            message: body.to_string(),
            nickname: self.identity.nickname.clone(),
            member_id: self.identity.member_id,
            chat_room_id: room_id,
        };
        let body_value = match serde_json::to_value(&envelope) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, "failed to encode chat publish envelope");
                return (PublishOutcome::Dropped, actions);
            },
        };

        let outcome =
            self.registry.publish(Topic::Room(room_id), body_value, self.connection.is_connected());
        self.drain_registry(&mut actions);

        match outcome {
            PublishOutcome::Sent => {},
            PublishOutcome::Deferred => {
                actions.push(SessionAction::Notify(SessionNotice::PublishDeferred { room_id }));
            },
            PublishOutcome::Dropped => {
                tracing::warn!(%room_id, "chat publish dropped, deferred queue full");
            },
        }

        (outcome, actions)
    }

    /// Ask to join the matchmaking queue.
    ///
    /// Returns the REST action to execute; the state machine moves only when
    /// the driver reports the result. Fails synchronously when the user is
    /// already queued or in a room.
    pub fn join_queue(&mut self) -> Result<Vec<SessionAction>, QueueError> {
        self.queue.begin_join()?;
        Ok(vec![SessionAction::CallJoinQueue])
    }

    /// Ask to leave the matchmaking queue.
    pub fn leave_queue(&mut self) -> Result<Vec<SessionAction>, QueueError> {
        self.queue.begin_leave()?;
        Ok(vec![SessionAction::CallLeaveQueue])
    }

    /// Enter the matched room.
    ///
    /// `participant_count` comes from the caller's room-join response; the
    /// real-time channel does not carry it.
    pub fn join_room(
        &mut self,
        room_id: RoomId,
        participant_count: u32,
    ) -> Result<Vec<SessionAction>, QueueError> {
        self.queue.room_joined(room_id)?;
        self.store.join_room(room_id, participant_count);
        self.registry.subscribe(Topic::Room(room_id), self.connection.is_connected());

        let mut actions = Vec::new();
        self.drain_registry(&mut actions);
        actions.push(SessionAction::Notify(SessionNotice::QueueChanged {
            state: self.queue.state(),
        }));
        actions.push(SessionAction::Notify(SessionNotice::RoomUpdated { room_id }));
        Ok(actions)
    }

    /// Leave the active room, discarding its messages and subscription.
    pub fn leave_room(&mut self) -> Result<Vec<SessionAction>, QueueError> {
        let room_id = self.queue.room_left()?;
        let _ = self.store.leave_room(room_id);
        self.registry.unsubscribe(Topic::Room(room_id), self.connection.is_connected());

        let mut actions = Vec::new();
        self.drain_registry(&mut actions);
        actions.push(SessionAction::Notify(SessionNotice::QueueChanged {
            state: self.queue.state(),
        }));
        actions.push(SessionAction::Notify(SessionNotice::RoomClosed { room_id }));
        Ok(actions)
    }

    /// Reset to the signed-out baseline: queue Idle, no rooms, no
    /// subscriptions. The connection is left to a separate
    /// [`Session::disconnect`] call.
    pub fn reset(&mut self) -> Vec<SessionAction> {
        self.queue.reset();
        self.store.clear();
        self.registry.clear(self.connection.is_connected());

        let mut actions = Vec::new();
        self.drain_registry(&mut actions);
        actions
            .push(SessionAction::Notify(SessionNotice::QueueChanged { state: self.queue.state() }));
        actions
    }

    // -- Driver events -----------------------------------------------------

    /// Process a driver event and return the effects to execute.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::TransportOpened => self.handle_transport_opened(),
            SessionEvent::TransportClosed { reason } => self.handle_transport_closed(&reason),
            SessionEvent::FrameReceived(frame) => self.handle_frame(frame),
            SessionEvent::Tick => map_connection_actions(self.connection.tick(self.env.now())),
            SessionEvent::JoinQueueResolved { success } => self.handle_join_resolved(success),
            SessionEvent::LeaveQueueResolved { success } => self.handle_leave_resolved(success),
        }
    }

    fn handle_transport_opened(&mut self) -> Vec<SessionAction> {
        let before = self.connection.state();
        if !self.connection.transport_opened() {
            return Vec::new();
        }

        let mut actions = Vec::new();
        self.notice_connection_change(before, &mut actions);

        // Service handshake behavior: the matchmaking-status topic is always
        // (re)subscribed, then every durable intent and parked publish goes
        // out.
        self.registry.ensure(Topic::QueueStatus);
        self.registry.replay();
        self.drain_registry(&mut actions);
        actions
    }

    fn handle_transport_closed(&mut self, reason: &str) -> Vec<SessionAction> {
        let before = self.connection.state();
        let retrying = self.connection.transport_closed(self.env.now());
        if retrying {
            tracing::warn!(reason, "connection dropped, reconnecting");
        } else {
            tracing::info!(reason, "connection closed");
        }

        let mut actions = Vec::new();
        self.notice_connection_change(before, &mut actions);
        actions
    }

    fn handle_join_resolved(&mut self, success: bool) -> Vec<SessionAction> {
        if !self.queue.join_resolved(success) {
            return Vec::new();
        }

        self.registry.subscribe(Topic::QueueStatus, self.connection.is_connected());
        let mut actions = Vec::new();
        self.drain_registry(&mut actions);
        actions
            .push(SessionAction::Notify(SessionNotice::QueueChanged { state: self.queue.state() }));
        actions
    }

    fn handle_leave_resolved(&mut self, success: bool) -> Vec<SessionAction> {
        if !self.queue.leave_resolved(success) {
            return Vec::new();
        }

        self.registry.unsubscribe(Topic::QueueStatus, self.connection.is_connected());
        let mut actions = Vec::new();
        self.drain_registry(&mut actions);
        actions
            .push(SessionAction::Notify(SessionNotice::QueueChanged { state: self.queue.state() }));
        actions
    }

    /// Route an inbound frame by topic.
    fn handle_frame(&mut self, frame: ServerFrame) -> Vec<SessionAction> {
        let ServerFrame::Message { topic, body } = frame;

        if !self.registry.is_subscribed(topic) {
            tracing::debug!(%topic, "delivery for unsubscribed topic dropped");
            return Vec::new();
        }

        match topic {
            Topic::QueueStatus => self.handle_queue_body(body),
            Topic::Room(room_id) => self.handle_chat_body(room_id, body),
        }
    }

    fn handle_queue_body(&mut self, body: serde_json::Value) -> Vec<SessionAction> {
        let event: QueueEvent = match payloads::from_body("queue event", body) {
            Ok(event) => event,
            Err(error) => {
                tracing::warn!(%error, "dropping malformed queue event");
                return Vec::new();
            },
        };

        match self.queue.apply_event(event) {
            QueueSignal::StatusUpdated => {
                vec![SessionAction::Notify(SessionNotice::QueueStatusUpdated)]
            },
            QueueSignal::Matched(room_id) => {
                self.registry.unsubscribe(Topic::QueueStatus, self.connection.is_connected());

                let mut actions = Vec::new();
                self.drain_registry(&mut actions);
                actions.push(SessionAction::Notify(SessionNotice::QueueChanged {
                    state: self.queue.state(),
                }));
                actions.push(SessionAction::Notify(SessionNotice::MatchFound { room_id }));
                actions
            },
            QueueSignal::Ignored => Vec::new(),
        }
    }

    fn handle_chat_body(&mut self, topic_room: RoomId, body: serde_json::Value) -> Vec<SessionAction> {
        let delivery: ChatDelivery = match payloads::from_body("chat delivery", body) {
            Ok(delivery) => delivery,
            Err(error) => {
                tracing::warn!(%error, room_id = %topic_room, "dropping malformed chat delivery");
                return Vec::new();
            },
        };

        if delivery.chat_room_id != topic_room {
            tracing::warn!(
                topic = %topic_room,
                envelope = %delivery.chat_room_id,
                "chat delivery room does not match its topic"
            );
        }

        match self.store.apply_remote(&delivery, &self.identity.nickname) {
            RemoteOutcome::Appended | RemoteOutcome::Merged => {
                vec![SessionAction::Notify(SessionNotice::RoomUpdated {
                    room_id: delivery.chat_room_id,
                })]
            },
            RemoteOutcome::Suppressed => Vec::new(),
            RemoteOutcome::UnknownRoom => {
                tracing::warn!(room_id = %delivery.chat_room_id, "delivery for unowned room dropped");
                Vec::new()
            },
        }
    }

    // -- Internals ---------------------------------------------------------

    fn drain_registry(&mut self, actions: &mut Vec<SessionAction>) {
        for frame in self.registry.take_outgoing() {
            actions.push(SessionAction::SendFrame(frame));
        }
    }

    fn notice_connection_change(&self, before: ConnectionState, actions: &mut Vec<SessionAction>) {
        let state = self.connection.state();
        if state != before {
            actions.push(SessionAction::Notify(SessionNotice::ConnectionChanged { state }));
        }
    }
}

/// Lift connection-machine actions into session actions.
fn map_connection_actions(
    actions: Vec<crate::connection::ConnectionAction>,
) -> Vec<SessionAction> {
    actions
        .into_iter()
        .map(|action| match action {
            crate::connection::ConnectionAction::Dial => SessionAction::Dial,
            crate::connection::ConnectionAction::Close => SessionAction::CloseTransport,
        })
        .collect()
}
