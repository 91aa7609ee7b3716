//! Time sources
//!
//! Transaction headers carry a wall-clock timestamp and caches expire on a
//! monotonic clock; both are injected so tests can pin them.

use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Monotonic time for expiry bookkeeping
    fn now(&self) -> Instant;

    /// Seconds since the Unix epoch
    fn unix_time(&self) -> u64;
}

/// Process clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn unix_time(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    unix_start: u64,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new(unix_start: u64) -> Self {
        Self {
            start: Instant::now(),
            unix_start,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset += by;
        }
    }

    fn elapsed(&self) -> Duration {
        self.offset.lock().map(|o| *o).unwrap_or(Duration::ZERO)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn unix_time(&self) -> u64 {
        self.unix_start + self.elapsed().as_secs()
    }
}
