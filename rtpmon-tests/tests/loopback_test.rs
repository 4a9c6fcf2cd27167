//! Loopback tests
//!
//! Two probes on 127.0.0.1: one streams, the other analyzes.

use rtpmon::{Probe, ProbeConfig, ProbeError};
use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn loopback() -> SocketAddr {
    "127.0.0.1:0".parse().unwrap()
}

#[test]
fn test_stream_between_probes() -> Result<(), ProbeError> {
    let mut receiver = Probe::bind(ProbeConfig {
        report_interval: Duration::from_millis(100),
        ..ProbeConfig::new(loopback(), loopback())
    })?;
    let target = receiver.local_addr()?;

    let (report_tx, report_rx) = mpsc::channel();
    receiver.start_reporter(move |report| {
        let _ = report_tx.send(*report);
    })?;

    let mut sender = Probe::bind(ProbeConfig::new(loopback(), target))?;
    sender.start_sender()?;

    assert!(receiver.wait_for_first_packet_timeout(Duration::from_secs(2)));
    thread::sleep(Duration::from_millis(500));

    let sent = sender.shutdown()?;
    thread::sleep(Duration::from_millis(100));
    let received = receiver.shutdown()?;

    assert!(sent.packets_sent > 0);
    assert!(received.stats.received > 0);
    assert!(received.stats.received <= sent.packets_sent);
    assert!(received.stats.total >= received.stats.received - received.stats.duplicates);
    // Fewer than a window's worth of packets: nothing retired yet
    assert_eq!(received.window_advances, 0);
    assert_eq!(received.stats.lost, 0);
    assert!(received.reports >= 1);

    let reports: Vec<_> = report_rx.try_iter().collect();
    assert!(!reports.is_empty());
    assert!(reports.windows(2).all(|w| w[0].uptime <= w[1].uptime));

    Ok(())
}

#[test]
fn test_server_waits_for_client() -> Result<(), ProbeError> {
    let mut server = Probe::bind(ProbeConfig::new(loopback(), loopback()))?;
    let target = server.local_addr()?;

    // No client yet
    assert!(!server.wait_for_first_packet_timeout(Duration::from_millis(100)));

    let mut client = Probe::bind(ProbeConfig::new(loopback(), target))?;
    client.start_sender()?;

    assert!(server.wait_for_first_packet_timeout(Duration::from_secs(2)));
    assert!(server.stats().snapshot().received >= 1);

    client.shutdown()?;
    server.shutdown()?;
    Ok(())
}
