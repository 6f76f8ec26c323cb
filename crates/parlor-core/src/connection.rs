//! Connection lifecycle state machine.
//!
//! Owns the logical state of the one persistent connection. The machine is
//! pure: it never dials a socket, it tells the driver to, via
//! [`ConnectionAction`]. Time is passed in by the caller so reconnect timing
//! is testable without sleeping.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐  connect   ┌────────────┐   opened    ┌───────────┐
//! │ Disconnected │───────────>│ Connecting │────────────>│ Connected │
//! └──────────────┘            └────────────┘             └───────────┘
//!        ▲                                                     │
//!        │ disconnect (from any state)                         │ unexpected
//!        │                                                     │ close
//!        │                    ┌──────────────┐   retry dial    │
//!        └────────────────────│ Reconnecting │<────────────────┘
//!                             └──────────────┘
//!                               │        ▲
//!                               └────────┘
//!                            failed dial reschedules
//! ```
//!
//! Reconnection is a fixed delay with no retry bound: the service expects
//! clients to keep trying until told to disconnect.

use std::{
    ops::{Add, Sub},
    time::Duration,
};

/// Delay between an unexpected drop and the next dial attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Logical state of the persistent connection.
///
/// Exactly one state holds at a time; transitions are driven only by
/// [`ConnectionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none wanted.
    Disconnected,
    /// First dial in flight.
    Connecting,
    /// Transport is up.
    Connected,
    /// Transport dropped unexpectedly; retrying on a timer.
    Reconnecting,
}

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Delay before each reconnect attempt after an unexpected drop.
    pub reconnect_delay: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { reconnect_delay: DEFAULT_RECONNECT_DELAY }
    }
}

/// Effects the driver must execute for the connection machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a transport to the configured endpoint.
    Dial,
    /// Tear down the active transport, if any.
    Close,
}

/// Connection lifecycle state machine.
///
/// Generic over the instant type so reconnect scheduling works with real or
/// virtual time.
#[derive(Debug, Clone)]
pub struct ConnectionManager<I> {
    state: ConnectionState,
    config: ConnectionConfig,
    /// A dial was issued and neither opened nor closed yet.
    dial_in_flight: bool,
    /// The last teardown was requested by the caller, not the network.
    deliberate_close: bool,
    retry_at: Option<I>,
}

impl<I> ConnectionManager<I>
where
    I: Copy + Ord + Add<Duration, Output = I> + Sub<I, Output = Duration>,
{
    /// Create a manager in [`ConnectionState::Disconnected`].
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            config,
            dial_in_flight: false,
            deliberate_close: false,
            retry_at: None,
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the transport is currently usable for frames.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Request a connection.
    ///
    /// Idempotent: while Connected this is a no-op, and while a dial is
    /// already in flight no second dial is issued; the caller simply waits
    /// on the attempt already running.
    pub fn request_connect(&mut self) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Connected || self.dial_in_flight {
            return Vec::new();
        }

        self.state = ConnectionState::Connecting;
        self.deliberate_close = false;
        self.dial_in_flight = true;
        self.retry_at = None;
        vec![ConnectionAction::Dial]
    }

    /// Request a teardown. Safe from any state; cancels pending retries.
    pub fn request_disconnect(&mut self) -> Vec<ConnectionAction> {
        self.state = ConnectionState::Disconnected;
        self.deliberate_close = true;
        self.dial_in_flight = false;
        self.retry_at = None;
        vec![ConnectionAction::Close]
    }

    /// The driver's dial succeeded.
    ///
    /// Returns `true` when the machine transitioned to Connected (the caller
    /// must replay subscriptions); `false` when the open raced a deliberate
    /// disconnect and should be ignored.
    pub fn transport_opened(&mut self) -> bool {
        self.dial_in_flight = false;

        if self.deliberate_close {
            tracing::debug!("transport opened after deliberate disconnect, ignoring");
            return false;
        }

        self.state = ConnectionState::Connected;
        self.retry_at = None;
        true
    }

    /// The transport dropped or a dial failed.
    ///
    /// Unexpected drops schedule a retry `reconnect_delay` after `now` and
    /// return `true`; deliberate teardowns settle in Disconnected and return
    /// `false`.
    pub fn transport_closed(&mut self, now: I) -> bool {
        self.dial_in_flight = false;

        if self.deliberate_close || self.state == ConnectionState::Disconnected {
            self.state = ConnectionState::Disconnected;
            self.retry_at = None;
            return false;
        }

        self.state = ConnectionState::Reconnecting;
        self.retry_at = Some(now + self.config.reconnect_delay);
        true
    }

    /// Drive pending retry timers.
    ///
    /// Call periodically; emits a dial when the retry deadline has passed.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        if self.dial_in_flight {
            return Vec::new();
        }

        match self.retry_at {
            Some(at) if now >= at => {
                self.retry_at = None;
                self.dial_in_flight = true;
                tracing::debug!("reconnect delay elapsed, dialing");
                vec![ConnectionAction::Dial]
            },
            _ => Vec::new(),
        }
    }
}
