//! Interarrival jitter and clock skew estimation
//!
//! Jitter follows the RFC 3550 exponential filter `J += (|D| - J) / 16`,
//! where `D` is the difference between the arrival spacing and the media
//! timestamp spacing of two consecutive packets. Skew is the drift of a
//! packet's arrival time against its media timestamp, both measured from the
//! first packet of the stream; only the largest magnitude is kept.

use crate::packet::PacketRecord;
use std::time::Instant;

/// Default media clock rate (G.711)
pub const DEFAULT_CLOCK_RATE_HZ: u32 = 8000;

/// Default smoothing divisor from RFC 3550
pub const DEFAULT_SMOOTHING_DIVISOR: f64 = 16.0;

/// Size of the 32-bit media timestamp space
const TIMESTAMP_SPACE: f64 = 4_294_967_296.0;

/// Estimator parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterConfig {
    /// Media clock rate in Hz
    pub clock_rate_hz: u32,
    /// Smoothing divisor of the exponential filter
    pub smoothing_divisor: f64,
}

impl JitterConfig {
    /// Media clock ticks per millisecond
    #[inline]
    pub fn ticks_per_ms(&self) -> f64 {
        self.clock_rate_hz as f64 / 1000.0
    }
}

impl Default for JitterConfig {
    fn default() -> Self {
        JitterConfig {
            clock_rate_hz: DEFAULT_CLOCK_RATE_HZ,
            smoothing_divisor: DEFAULT_SMOOTHING_DIVISOR,
        }
    }
}

/// Result of observing one consecutive pair (all values in milliseconds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterSample {
    /// Instantaneous transit difference `D`
    pub transit_delta: f64,
    /// Smoothed jitter after this sample
    pub jitter: f64,
    /// Skew of the current packet against the reference packet
    pub skew: f64,
}

/// Smoothed jitter and peak skew tracker
#[derive(Debug, Clone)]
pub struct JitterEstimator {
    config: JitterConfig,
    /// Smoothed jitter (ms)
    jitter: f64,
    /// Largest smoothed jitter seen (ms)
    max_jitter: f64,
    /// Skew with the largest magnitude seen (ms)
    max_skew: f64,
    /// Number of pairs observed
    sample_count: u64,
}

impl JitterEstimator {
    /// Create a new estimator
    pub fn new(config: JitterConfig) -> Self {
        JitterEstimator {
            config,
            jitter: 0.0,
            max_jitter: 0.0,
            max_skew: 0.0,
            sample_count: 0,
        }
    }

    /// Observe two temporally adjacent present packets
    ///
    /// `reference` is the first packet ever received by the analyzer.
    pub fn observe(
        &mut self,
        prev: &PacketRecord,
        curr: &PacketRecord,
        reference: &PacketRecord,
    ) -> JitterSample {
        let r_delta = signed_millis(curr.arrival, prev.arrival);
        let p_delta = self.media_millis(curr.media_timestamp, prev.media_timestamp);
        let d = r_delta - p_delta;

        self.jitter += (d.abs() - self.jitter) / self.config.smoothing_divisor;
        if self.jitter > self.max_jitter {
            self.max_jitter = self.jitter;
        }

        let r_d = signed_millis(curr.arrival, reference.arrival);
        let p_d = self.media_millis_since_reference(
            curr.media_timestamp,
            reference.media_timestamp,
            r_d,
        );
        let skew = r_d - p_d;
        if skew.abs() > self.max_skew.abs() {
            self.max_skew = skew;
        }

        self.sample_count += 1;

        JitterSample {
            transit_delta: d,
            jitter: self.jitter,
            skew,
        }
    }

    /// Current smoothed jitter (ms)
    #[inline]
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Largest smoothed jitter seen (ms)
    #[inline]
    pub fn max_jitter(&self) -> f64 {
        self.max_jitter
    }

    /// Skew with the largest magnitude seen, sign preserved (ms)
    #[inline]
    pub fn max_skew(&self) -> f64 {
        self.max_skew
    }

    /// Number of pairs observed
    #[inline]
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Estimator parameters
    pub fn config(&self) -> &JitterConfig {
        &self.config
    }

    /// Media timestamp difference in milliseconds (wrapping, signed)
    fn media_millis(&self, later: u32, earlier: u32) -> f64 {
        later.wrapping_sub(earlier) as i32 as f64 / self.config.ticks_per_ms()
    }

    /// Media time from the reference packet in milliseconds
    ///
    /// The 32-bit timestamp wraps every 2^32 ticks, so the raw difference is
    /// unwrapped to the multiple of 2^32 closest to the elapsed arrival time.
    fn media_millis_since_reference(&self, ts: u32, reference_ts: u32, elapsed_ms: f64) -> f64 {
        let ticks_per_ms = self.config.ticks_per_ms();
        let raw = ts.wrapping_sub(reference_ts) as f64;
        let expected = elapsed_ms * ticks_per_ms;
        let wraps = ((expected - raw) / TIMESTAMP_SPACE).round();
        (raw + wraps * TIMESTAMP_SPACE) / ticks_per_ms
    }
}

impl Default for JitterEstimator {
    fn default() -> Self {
        Self::new(JitterConfig::default())
    }
}

/// `later - earlier` in milliseconds, negative when `later` precedes `earlier`
fn signed_millis(later: Instant, earlier: Instant) -> f64 {
    if later >= earlier {
        later.duration_since(earlier).as_secs_f64() * 1000.0
    } else {
        -(earlier.duration_since(later).as_secs_f64() * 1000.0)
    }
}
