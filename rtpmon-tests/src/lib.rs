//! Shared helpers for the rtpmon integration tests

use rtpmon_protocol::{Arrival, PacketRecord, SeqNumber, StreamAnalyzer};
use std::time::{Duration, Instant};

/// Media clock ticks per 20 ms packet at 8 kHz
pub const SAMPLES_PER_PACKET: u32 = 160;

/// Nominal packet spacing
pub const PACKET_SPACING_MS: u64 = 20;

/// Record for the `n`th packet of a perfectly paced stream starting at `first`
pub fn paced_record(start: Instant, first: u16, n: u32) -> PacketRecord {
    PacketRecord::new(
        SeqNumber::new(first.wrapping_add(n as u16)),
        n.wrapping_mul(SAMPLES_PER_PACKET),
        start + Duration::from_millis(n as u64 * PACKET_SPACING_MS),
    )
}

/// Like [`paced_record`], arriving `delay_ms` later than its nominal time
pub fn delayed_record(start: Instant, first: u16, n: u32, delay_ms: u64) -> PacketRecord {
    let mut record = paced_record(start, first, n);
    record.arrival += Duration::from_millis(delay_ms);
    record
}

/// Feed the given packet indices of a paced stream, in order
pub fn feed<I>(analyzer: &mut StreamAnalyzer, start: Instant, first: u16, indices: I) -> Vec<Arrival>
where
    I: IntoIterator<Item = u32>,
{
    indices
        .into_iter()
        .map(|n| analyzer.on_arrival(paced_record(start, first, n)))
        .collect()
}
