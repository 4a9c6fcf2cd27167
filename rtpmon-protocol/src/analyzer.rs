//! Stream analyzer
//!
//! Single entry point for every arriving packet. Owns the receive window, the
//! jitter estimator and the permanent reference packet, and publishes the
//! resulting metrics to [`SharedStats`].

use crate::jitter::{JitterConfig, JitterEstimator};
use crate::loss::{self, PairVerdict};
use crate::packet::PacketRecord;
use crate::sequence::SeqNumber;
use crate::stats::SharedStats;
use crate::window::{ReceiveWindow, DEFAULT_CAPACITY};

/// Analyzer parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerConfig {
    /// Receive window capacity in slots (even)
    pub capacity: usize,
    /// Jitter estimator parameters
    pub jitter: JitterConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            capacity: DEFAULT_CAPACITY,
            jitter: JitterConfig::default(),
        }
    }
}

/// What happened to an arriving packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// First packet of the stream; it became the reference packet
    First,
    /// Stored in its window slot
    Accepted,
    /// Its slot was already retired; dropped
    Late,
    /// Its slot was already occupied; the newer copy replaced it
    Duplicate,
}

/// State that exists once the first packet has been seen
#[derive(Debug)]
struct StreamState {
    window: ReceiveWindow,
    /// First packet ever received, kept for skew computation
    reference: PacketRecord,
    /// Highest sequence number seen
    last_sequence: SeqNumber,
    /// Unwrapped distance from the reference sequence to `last_sequence`
    highest_offset: u64,
}

impl StreamState {
    fn new(first: &PacketRecord, capacity: usize) -> Self {
        StreamState {
            window: ReceiveWindow::new(capacity, first.sequence),
            reference: first.clone(),
            last_sequence: first.sequence,
            highest_offset: 0,
        }
    }

    /// Retire the lower half of the window, returning the number of lost slots
    fn advance(&mut self, estimator: &mut JitterEstimator) -> u64 {
        let base = self.window.base();
        let mut lost = 0;

        for (index, (slot_a, slot_b)) in self.window.retiring_pairs().enumerate() {
            match loss::evaluate(slot_a, slot_b) {
                PairVerdict::Lost => {
                    lost += 1;
                    tracing::debug!("Lost: seq={}", base + index as u16);
                }
                PairVerdict::MissingSuccessor(prev) => {
                    tracing::debug!("No successor for seq={}, sample skipped", prev.sequence);
                }
                PairVerdict::Pair(prev, curr) => {
                    let sample = estimator.observe(prev, curr, &self.reference);
                    tracing::debug!(
                        "D: {:.2}, J: {:.2}, skew: {:.2}",
                        sample.transit_delta,
                        sample.jitter,
                        sample.skew
                    );
                }
            }
        }

        self.window.shift();
        tracing::trace!(
            "Window advanced: base {} -> {}, lost {}",
            base,
            self.window.base(),
            lost
        );
        lost
    }
}

/// Sliding-window jitter, skew and loss analyzer
#[derive(Debug)]
pub struct StreamAnalyzer {
    config: AnalyzerConfig,
    state: Option<StreamState>,
    estimator: JitterEstimator,
    stats: SharedStats,
    advances: u64,
}

impl StreamAnalyzer {
    /// Create a new analyzer publishing to fresh statistics
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_stats(config, SharedStats::new())
    }

    /// Create a new analyzer publishing to an existing statistics handle
    pub fn with_stats(config: AnalyzerConfig, stats: SharedStats) -> Self {
        assert!(
            ReceiveWindow::is_valid_capacity(config.capacity),
            "window capacity {} must be even and within 2..=32768",
            config.capacity
        );

        StreamAnalyzer {
            config,
            state: None,
            estimator: JitterEstimator::new(config.jitter),
            stats,
            advances: 0,
        }
    }

    /// Process one arriving packet
    pub fn on_arrival(&mut self, record: PacketRecord) -> Arrival {
        let first = self.state.is_none();
        let capacity = self.config.capacity;
        let state = self
            .state
            .get_or_insert_with(|| StreamState::new(&record, capacity));

        let seq = record.sequence;
        if first {
            tracing::info!("First packet: seq={}, ts={}", seq, record.media_timestamp);
        }

        if state.window.is_behind(seq) {
            tracing::debug!("Late packet dropped: seq={} (base {})", seq, state.window.base());
            self.stats.update(|s| {
                s.received += 1;
                s.late += 1;
            });
            return Arrival::Late;
        }

        let mut lost = 0;
        while state.window.needs_advance(seq) {
            lost += state.advance(&mut self.estimator);
            self.advances += 1;
        }

        let duplicate = state.window.insert(record).is_some();
        if duplicate {
            tracing::debug!("Duplicate packet: seq={}", seq);
        }

        let distance = state.last_sequence.distance_to(seq);
        if distance > 0 {
            state.last_sequence = seq;
            state.highest_offset += distance as u64;
        }
        let total = state.highest_offset + 1;

        let max_jitter = self.estimator.max_jitter();
        let max_skew = self.estimator.max_skew();
        self.stats.update(|s| {
            s.received += 1;
            s.lost += lost;
            s.total = total;
            s.max_jitter = max_jitter;
            s.max_skew = max_skew;
            if duplicate {
                s.duplicates += 1;
            }
        });

        if first {
            Arrival::First
        } else if duplicate {
            Arrival::Duplicate
        } else {
            Arrival::Accepted
        }
    }

    /// Handle to the statistics this analyzer publishes
    pub fn stats(&self) -> SharedStats {
        self.stats.clone()
    }

    /// The permanent reference packet, once one has arrived
    pub fn reference(&self) -> Option<&PacketRecord> {
        self.state.as_ref().map(|s| &s.reference)
    }

    /// Current window base sequence number
    pub fn base(&self) -> Option<SeqNumber> {
        self.state.as_ref().map(|s| s.window.base())
    }

    /// Highest sequence number seen
    pub fn last_sequence(&self) -> Option<SeqNumber> {
        self.state.as_ref().map(|s| s.last_sequence)
    }

    /// The receive window, once the first packet has arrived
    pub fn window(&self) -> Option<&ReceiveWindow> {
        self.state.as_ref().map(|s| &s.window)
    }

    /// Jitter estimator state
    pub fn estimator(&self) -> &JitterEstimator {
        &self.estimator
    }

    /// Number of half-window advances performed
    pub fn advances(&self) -> u64 {
        self.advances
    }

    /// Analyzer parameters
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }
}

impl Default for StreamAnalyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}
