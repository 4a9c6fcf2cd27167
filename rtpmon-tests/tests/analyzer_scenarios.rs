//! End-to-end analyzer scenarios
//!
//! Drive the analyzer with hand-built arrival sequences and check the
//! published statistics.

use rtpmon_protocol::{Arrival, SeqNumber, StreamAnalyzer};
use rtpmon_tests::{delayed_record, feed, paced_record};
use std::time::Instant;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn test_single_advance_after_full_window() {
    let start = Instant::now();
    let mut analyzer = StreamAnalyzer::default();

    let arrivals = feed(&mut analyzer, start, 1000, 0..200);
    assert_eq!(arrivals[0], Arrival::First);
    assert!(arrivals[1..].iter().all(|a| *a == Arrival::Accepted));
    assert_eq!(analyzer.advances(), 0);
    assert_eq!(analyzer.base(), Some(SeqNumber::new(1000)));

    feed(&mut analyzer, start, 1000, 200..201);

    assert_eq!(analyzer.advances(), 1);
    assert_eq!(analyzer.base(), Some(SeqNumber::new(1100)));
    let stats = analyzer.stats().snapshot();
    assert_eq!(stats.lost, 0);
    assert_eq!(stats.total, 201);
    assert_eq!(stats.received, 201);

    // Slot of the first packet is gone, the reference is not
    let reference = analyzer.reference().unwrap();
    assert_eq!(reference.sequence, SeqNumber::new(1000));
    assert!(!analyzer.window().unwrap().contains(SeqNumber::new(1000)));
}

#[test]
fn test_skew_measured_against_retired_first_packet() {
    let start = Instant::now();
    let mut analyzer = StreamAnalyzer::default();

    // From packet 150 on, everything arrives 30 ms behind schedule
    let record = |n: u32| {
        if n < 150 {
            paced_record(start, 0, n)
        } else {
            delayed_record(start, 0, n, 30)
        }
    };

    for n in 0..=200 {
        analyzer.on_arrival(record(n));
    }
    assert_eq!(analyzer.advances(), 1);
    assert!(approx(analyzer.estimator().max_skew(), 0.0));

    for n in 201..=300 {
        analyzer.on_arrival(record(n));
    }

    assert_eq!(analyzer.advances(), 2);
    let stats = analyzer.stats().snapshot();
    assert!(approx(stats.max_skew, 30.0));
    assert_eq!(stats.lost, 0);
    // A single 30 ms step in transit time at pair (149, 150)
    assert!(approx(stats.max_jitter, 30.0 / 16.0));
}

#[test]
fn test_adjacent_gap_counts_each_slot_once() {
    let start = Instant::now();
    let mut analyzer = StreamAnalyzer::default();

    let indices = (0..=200).filter(|n| *n != 50 && *n != 51);
    feed(&mut analyzer, start, 0, indices);

    let stats = analyzer.stats().snapshot();
    assert_eq!(stats.lost, 2);
    assert_eq!(stats.total, 201);
    assert_eq!(stats.received, 199);
    // Pairs (49,50), (50,51), (51,52) contribute no sample
    assert_eq!(analyzer.estimator().sample_count(), 97);
}

#[test]
fn test_single_delay_decays_by_sixteenth() {
    let start = Instant::now();
    let mut analyzer = StreamAnalyzer::default();

    for n in 0..=200u32 {
        let record = if n == 10 {
            delayed_record(start, 0, n, 16)
        } else {
            paced_record(start, 0, n)
        };
        analyzer.on_arrival(record);
    }

    // D = +16 for (9,10), D = -16 for (10,11): J = 1, then 1 + (16 - 1) / 16
    let peak = 1.0 + 15.0 / 16.0;
    assert!(approx(analyzer.estimator().max_jitter(), peak));

    // 89 zero samples follow
    let expected = peak * (15.0f64 / 16.0).powi(89);
    assert!(approx(analyzer.estimator().jitter(), expected));
}

#[test]
fn test_late_and_duplicate_packets_are_counted() {
    let start = Instant::now();
    let mut analyzer = StreamAnalyzer::default();

    feed(&mut analyzer, start, 65_500, 0..250);
    assert_eq!(analyzer.base(), Some(SeqNumber::new(65_500u16.wrapping_add(100))));

    // Retired slot
    assert_eq!(
        analyzer.on_arrival(paced_record(start, 65_500, 20)),
        Arrival::Late
    );
    // Still in the window
    assert_eq!(
        analyzer.on_arrival(paced_record(start, 65_500, 240)),
        Arrival::Duplicate
    );

    let stats = analyzer.stats().snapshot();
    assert_eq!(stats.late, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.received, 252);
    assert_eq!(stats.total, 250);
    assert_eq!(stats.lost, 0);
}

#[test]
fn test_total_grows_across_sequence_wraparound() {
    let start = Instant::now();
    let mut analyzer = StreamAnalyzer::default();

    feed(&mut analyzer, start, 65_530, 0..70_000);

    let stats = analyzer.stats().snapshot();
    assert_eq!(stats.total, 70_000);
    assert_eq!(stats.total % 65_536, 70_000 - 65_536);
    assert_eq!(stats.lost, 0);
    assert_eq!(
        analyzer.last_sequence(),
        Some(SeqNumber::new(65_530u16.wrapping_add((70_000 - 1) as u16)))
    );
}

#[test]
fn test_burst_loss_beyond_window() {
    let start = Instant::now();
    let mut analyzer = StreamAnalyzer::default();

    feed(&mut analyzer, start, 0, 0..10);
    // A 1000-packet outage
    feed(&mut analyzer, start, 0, 1010..1011);

    let stats = analyzer.stats().snapshot();
    assert_eq!(analyzer.advances(), 9);
    assert_eq!(analyzer.base(), Some(SeqNumber::new(900)));
    assert_eq!(stats.lost, 890);
    assert_eq!(stats.total, 1011);
}
