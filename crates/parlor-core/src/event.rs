//! Session events, actions, and notices.
//!
//! The driver feeds [`SessionEvent`]s into [`crate::Session::handle`] and
//! executes the [`SessionAction`]s that come back. User intents (connect,
//! send, join queue, ...) are direct methods on the session instead of
//! events, so their validation errors surface synchronously to the caller.

use parlor_proto::{ClientFrame, RoomId, ServerFrame};

use crate::{connection::ConnectionState, queue::QueueState};

/// Events originating from the driver (transport and REST results).
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The transport dial succeeded; the duplex connection is up.
    TransportOpened,

    /// The transport dropped or a dial attempt failed.
    TransportClosed {
        /// Human-readable cause, for logging only.
        reason: String,
    },

    /// A frame arrived from the server.
    FrameReceived(ServerFrame),

    /// Periodic tick for timer processing (reconnect delays).
    Tick,

    /// The join-queue REST request finished.
    JoinQueueResolved {
        /// Whether the service accepted the join.
        success: bool,
    },

    /// The leave-queue REST request finished.
    LeaveQueueResolved {
        /// Whether the service accepted the leave.
        success: bool,
    },
}

/// Effects the driver must execute on behalf of the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Open the WebSocket transport to the configured endpoint.
    Dial,

    /// Tear down the active transport.
    CloseTransport,

    /// Put a frame on the wire.
    SendFrame(ClientFrame),

    /// Issue the join-queue REST request; report back via
    /// [`SessionEvent::JoinQueueResolved`].
    CallJoinQueue,

    /// Issue the leave-queue REST request; report back via
    /// [`SessionEvent::LeaveQueueResolved`].
    CallLeaveQueue,

    /// Fan a state-change notice out to the presentation layer.
    Notify(SessionNotice),
}

/// Change notices for the presentation layer.
///
/// Notices signal *that* something changed; the current values are read
/// from the session's getters. This keeps render code pull-based and the
/// notice channel cheap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionNotice {
    /// The connection state moved.
    ConnectionChanged {
        /// New connection state.
        state: ConnectionState,
    },

    /// The queue state machine moved.
    QueueChanged {
        /// New queue state.
        state: QueueState,
    },

    /// A fresh queue snapshot replaced the previous one.
    QueueStatusUpdated,

    /// A match arrived; the presentation layer should join the room.
    MatchFound {
        /// Room the user was matched into.
        room_id: RoomId,
    },

    /// A room's message sequence or metadata changed.
    RoomUpdated {
        /// Room that changed.
        room_id: RoomId,
    },

    /// A room was torn down and its messages discarded.
    RoomClosed {
        /// Room that was discarded.
        room_id: RoomId,
    },

    /// A publish could not go out and was parked for the next reconnect.
    PublishDeferred {
        /// Room whose message is parked.
        room_id: RoomId,
    },
}
