//! Time utilities
//!
//! Idle detection for the receive path: a stream is considered stalled once
//! nothing has been received for a configured threshold.

use std::time::{Duration, Instant};

/// Tracks the time since the last activity on a stream
#[derive(Debug, Clone)]
pub struct IdleTimer {
    threshold: Duration,
    last_activity: Instant,
    last_warning: Option<Instant>,
}

impl IdleTimer {
    /// Create a new timer; the clock starts now
    pub fn new(threshold: Duration) -> Self {
        IdleTimer {
            threshold,
            last_activity: Instant::now(),
            last_warning: None,
        }
    }

    /// Record activity, rearming the timer
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        self.last_warning = None;
    }

    /// Time since the last activity
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Report the idle time once per elapsed threshold
    ///
    /// Returns `Some(idle)` the first time the threshold is crossed and again
    /// every further threshold of silence; `None` otherwise.
    pub fn check(&mut self) -> Option<Duration> {
        let since = self.last_warning.unwrap_or(self.last_activity);
        if since.elapsed() >= self.threshold {
            self.last_warning = Some(Instant::now());
            Some(self.idle_for())
        } else {
            None
        }
    }

    /// Idle threshold
    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}
