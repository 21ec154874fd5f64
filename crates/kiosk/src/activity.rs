//! Last-activity timestamp shared between event delivery and the watchdog

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Time of the last observed browser event
///
/// Stored as milliseconds since creation in a single atomic. Writers use
/// `fetch_max`, so the value never moves backwards no matter how
/// concurrent deliveries interleave.
#[derive(Debug)]
pub struct ActivityClock {
    origin: Instant,
    last_millis: AtomicU64,
}

impl ActivityClock {
    /// A clock whose last activity is "now"
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_millis: AtomicU64::new(0),
        }
    }

    /// Record activity at the current time
    pub fn touch(&self) {
        let now = self.origin.elapsed().as_millis() as u64;
        self.last_millis.fetch_max(now, Ordering::AcqRel);
    }

    /// When activity was last recorded
    pub fn last(&self) -> Instant {
        self.origin + Duration::from_millis(self.last_millis.load(Ordering::Acquire))
    }

    /// Time since the last recorded activity
    pub fn idle(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last())
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}
