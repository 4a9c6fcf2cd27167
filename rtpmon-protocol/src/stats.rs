//! Running stream statistics
//!
//! The analyzer is the only writer; reporters read point-in-time snapshots.
//! Snapshots are consistent per read but not synchronized with the arrival
//! of any particular packet.

use parking_lot::RwLock;
use std::sync::Arc;

/// Accumulated stream quality metrics
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStats {
    /// Largest smoothed jitter seen (ms)
    pub max_jitter: f64,
    /// Skew with the largest magnitude seen, sign preserved (ms)
    pub max_skew: f64,
    /// Sequence slots retired without a packet
    pub lost: u64,
    /// Span of sequence space observed: highest - first + 1
    pub total: u64,
    /// Packets physically received
    pub received: u64,
    /// Packets that arrived after their slot was retired
    pub late: u64,
    /// Packets whose slot was already occupied
    pub duplicates: u64,
}

impl RunningStats {
    /// Loss as a percentage of the observed sequence span
    ///
    /// Returns `None` when nothing has been observed yet.
    pub fn loss_percent(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.lost as f64 * 100.0 / self.total as f64)
        }
    }
}

/// Shared handle to the running statistics
#[derive(Debug, Clone, Default)]
pub struct SharedStats {
    inner: Arc<RwLock<RunningStats>>,
}

impl SharedStats {
    /// Create a new handle with zeroed statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current statistics
    pub fn snapshot(&self) -> RunningStats {
        *self.inner.read()
    }

    /// Apply a mutation under the write lock
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut RunningStats),
    {
        let mut guard = self.inner.write();
        f(&mut *guard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_percent() {
        let stats = RunningStats {
            lost: 5,
            total: 200,
            ..Default::default()
        };
        assert_eq!(stats.loss_percent(), Some(2.5));
    }

    #[test]
    fn test_loss_percent_guarded_when_empty() {
        let stats = RunningStats {
            lost: 10,
            total: 0,
            ..Default::default()
        };
        assert_eq!(stats.loss_percent(), None);
    }

    #[test]
    fn test_shared_updates_visible_to_clones() {
        let writer = SharedStats::new();
        let reader = writer.clone();

        writer.update(|s| {
            s.lost += 3;
            s.total = 100;
            s.max_jitter = 1.5;
        });

        let snapshot = reader.snapshot();
        assert_eq!(snapshot.lost, 3);
        assert_eq!(snapshot.total, 100);
        assert_eq!(snapshot.max_jitter, 1.5);
        assert_eq!(snapshot.loss_percent(), Some(3.0));
    }

    #[test]
    fn test_reader_thread_sees_progress() {
        let stats = SharedStats::new();
        let reader = stats.clone();

        let handle = std::thread::spawn(move || {
            for _ in 0..1000 {
                stats.update(|s| s.received += 1);
            }
        });
        handle.join().unwrap();

        assert_eq!(reader.snapshot().received, 1000);
    }
}
