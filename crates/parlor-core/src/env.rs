//! Environment abstraction for deterministic testing.
//!
//! Decouples the session core from system clocks. Production uses
//! [`SystemEnv`]; tests inject fixed or scripted time so reconnect timing
//! and message-id generation are fully reproducible.

use std::{
    ops::{Add, Sub},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// Abstract environment providing time to the session core.
///
/// # Invariants
///
/// - `now()` never goes backwards within one execution context.
/// - `unix_millis()` is wall-clock and MAY jump; consumers that need
///   monotonicity (message-id generation) clamp it themselves.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used for scheduling (reconnect timers).
    ///
    /// Production environments use [`std::time::Instant`]; simulation
    /// environments may substitute virtual time.
    type Instant: Copy
        + Ord
        + Send
        + Sync
        + Add<Duration, Output = Self::Instant>
        + Sub<Self::Instant, Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time as epoch milliseconds.
    fn unix_millis(&self) -> u64;
}

/// Production environment backed by the system clocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn unix_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
