//! Fixed-window event counter.
//!
//! Mutation takes `&mut self`; the breaker keeps the only instance behind its
//! state lock, so `record` and `reset` can never interleave.

use std::time::SystemTime;
use tokio::time::Instant;

/// Point-in-time view of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub count: u64,
    /// Monotonic start of the window.
    pub window_start: Instant,
    /// Wall-clock start of the window, for reporting.
    pub window_started_at: SystemTime,
}

/// Number of events seen since the last reset.
#[derive(Debug)]
pub struct WindowCounter {
    count: u64,
    window_start: Instant,
    window_started_at: SystemTime,
}

impl WindowCounter {
    pub fn new() -> Self {
        Self {
            count: 0,
            window_start: Instant::now(),
            window_started_at: SystemTime::now(),
        }
    }

    /// Count one event and return the new total for this window.
    pub fn record(&mut self) -> u64 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    /// Start a new, empty window.
    pub fn reset(&mut self) {
        self.count = 0;
        self.window_start = Instant::now();
        self.window_started_at = SystemTime::now();
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            count: self.count,
            window_start: self.window_start,
            window_started_at: self.window_started_at,
        }
    }
}

impl Default for WindowCounter {
    fn default() -> Self {
        Self::new()
    }
}
