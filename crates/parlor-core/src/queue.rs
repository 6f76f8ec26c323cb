//! Matchmaking queue state machine.
//!
//! Drives the user's journey from idle, through the waiting pool, into a
//! room. The machine is pure: join/leave REST calls are executed by the
//! driver, and only their *results* move state, so a failed request leaves
//! the user exactly where they were.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ join ok  ┌────────┐  MATCHED   ┌─────────┐ room join ┌────────┐
//! │ Idle │─────────>│ Queued │───────────>│ Matched │──────────>│ InRoom │
//! └──────┘          └────────┘            └─────────┘           └────────┘
//!     ▲   leave ok      │                                           │
//!     └─────────────────┘                 room leave                │
//!     ▲─────────────────────────────────────────────────────────────┘
//! ```
//!
//! `QUEUE_STATUS` pushes refresh the wait snapshot while Queued and change
//! nothing else; once the state has left Queued they are ignored, which is
//! what makes a duplicated `MATCHED` delivery harmless.

use parlor_proto::{
    RoomId,
    payloads::queue::{QueueEvent, QueueStatus},
};

use crate::error::QueueError;

/// Where the user is in the matchmaking lifecycle.
///
/// Exactly one instance exists per session; only [`QueueCoordinator`]
/// mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Not queued, not in a room.
    Idle,
    /// Waiting in the matchmaking pool.
    Queued,
    /// Matched into a room the presentation layer has not joined yet.
    Matched(RoomId),
    /// Actively in a room.
    InRoom(RoomId),
}

/// Reaction to an inbound queue event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueSignal {
    /// The wait snapshot was replaced.
    StatusUpdated,
    /// A match arrived; the presentation layer should enter the room.
    Matched(RoomId),
    /// Event did not apply to the current state and was dropped.
    Ignored,
}

/// Matchmaking queue coordinator.
#[derive(Debug, Clone)]
pub struct QueueCoordinator {
    state: QueueState,
    /// Latest wait snapshot, only meaningful while Queued.
    status: Option<QueueStatus>,
    /// A join request is out with the matchmaking service.
    join_pending: bool,
    /// A leave request is out with the matchmaking service.
    leave_pending: bool,
}

impl Default for QueueCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueCoordinator {
    /// Create a coordinator in [`QueueState::Idle`].
    pub fn new() -> Self {
        Self { state: QueueState::Idle, status: None, join_pending: false, leave_pending: false }
    }

    /// Current queue state.
    #[must_use]
    pub fn state(&self) -> QueueState {
        self.state
    }

    /// Latest wait snapshot. `None` unless Queued.
    #[must_use]
    pub fn status(&self) -> Option<&QueueStatus> {
        self.status.as_ref()
    }

    /// Validate and begin a join request.
    ///
    /// State does not change here; it changes when the driver reports the
    /// request's result via [`Self::join_resolved`].
    pub fn begin_join(&mut self) -> Result<(), QueueError> {
        if self.state != QueueState::Idle {
            return Err(QueueError::InvalidState { state: self.state, operation: "join queue" });
        }
        if self.join_pending {
            return Err(QueueError::RequestPending { operation: "join queue" });
        }
        self.join_pending = true;
        Ok(())
    }

    /// Apply the result of a join request. Returns `true` when the state
    /// moved to Queued.
    pub fn join_resolved(&mut self, success: bool) -> bool {
        self.join_pending = false;
        if success && self.state == QueueState::Idle {
            self.state = QueueState::Queued;
            tracing::info!("joined matchmaking queue");
            return true;
        }
        false
    }

    /// Validate and begin a leave request.
    pub fn begin_leave(&mut self) -> Result<(), QueueError> {
        if self.state != QueueState::Queued {
            return Err(QueueError::InvalidState { state: self.state, operation: "leave queue" });
        }
        if self.leave_pending {
            return Err(QueueError::RequestPending { operation: "leave queue" });
        }
        self.leave_pending = true;
        Ok(())
    }

    /// Apply the result of a leave request. Returns `true` when the state
    /// moved back to Idle.
    pub fn leave_resolved(&mut self, success: bool) -> bool {
        self.leave_pending = false;
        if success && self.state == QueueState::Queued {
            self.state = QueueState::Idle;
            self.status = None;
            tracing::info!("left matchmaking queue");
            return true;
        }
        false
    }

    /// Apply an inbound queue event.
    ///
    /// Only the Queued state consumes queue events; everything else ignores
    /// them, so a replayed `MATCHED` transitions exactly once.
    pub fn apply_event(&mut self, event: QueueEvent) -> QueueSignal {
        match (self.state, event) {
            (QueueState::Queued, QueueEvent::QueueStatus(status)) => {
                // Wholesale replacement; there are no merge semantics.
                self.status = Some(status);
                QueueSignal::StatusUpdated
            },
            (QueueState::Queued, QueueEvent::Matched { chat_room_id }) => {
                self.state = QueueState::Matched(chat_room_id);
                self.status = None;
                tracing::info!(room_id = %chat_room_id, "matched");
                QueueSignal::Matched(chat_room_id)
            },
            (state, event) => {
                tracing::debug!(?state, ?event, "queue event ignored in current state");
                QueueSignal::Ignored
            },
        }
    }

    /// The presentation layer entered the matched room.
    pub fn room_joined(&mut self, room_id: RoomId) -> Result<(), QueueError> {
        match self.state {
            QueueState::Matched(matched) if matched == room_id => {
                self.state = QueueState::InRoom(room_id);
                Ok(())
            },
            state => Err(QueueError::InvalidState { state, operation: "join room" }),
        }
    }

    /// The user left the active room. Returns the room id on success.
    pub fn room_left(&mut self) -> Result<RoomId, QueueError> {
        match self.state {
            QueueState::InRoom(room_id) => {
                self.state = QueueState::Idle;
                Ok(room_id)
            },
            state => Err(QueueError::InvalidState { state, operation: "leave room" }),
        }
    }

    /// Reset to Idle, dropping any snapshot and pending bookkeeping.
    /// Used on logout.
    pub fn reset(&mut self) {
        self.state = QueueState::Idle;
        self.status = None;
        self.join_pending = false;
        self.leave_pending = false;
    }
}
