//! Explicit timers for the cooperative event loop.
//!
//! Nothing here spawns threads or schedules callbacks. Owners call `poll`
//! from their own tick and act when it returns true.

#[cfg(target_arch = "wasm32")]
pub use web_time::{Duration, Instant, SystemTime, UNIX_EPOCH};
#[cfg(not(target_arch = "wasm32"))]
pub use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A repeating timer.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    last_fire: Option<Instant>,
}

impl Interval {
    /// Create a stopped interval.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_fire: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// (Re)start the interval; the first fire is one period after `now`.
    pub fn start(&mut self, now: Instant) {
        self.last_fire = Some(now);
    }

    pub fn cancel(&mut self) {
        self.last_fire = None;
    }

    pub fn is_running(&self) -> bool {
        self.last_fire.is_some()
    }

    /// Returns true at most once per period while running.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last_fire {
            Some(last) if now.saturating_duration_since(last) >= self.period => {
                self.last_fire = Some(now);
                true
            }
            _ => false,
        }
    }
}

/// A one-shot timer.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration) {
        self.at = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn is_pending(&self) -> bool {
        self.at.is_some()
    }

    /// Returns true exactly once, on the first poll at or after the deadline.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.at {
            Some(at) if now >= at => {
                self.at = None;
                true
            }
            _ => false,
        }
    }
}
