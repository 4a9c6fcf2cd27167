//! Probe assembly
//!
//! A probe owns one UDP socket used for both directions. Binding it starts the
//! receive path immediately; the reporter and sender are started by the
//! caller, after the first inbound packet when running as a server.

use crate::error::ProbeError;
use crate::receiver::{spawn_analyzer, spawn_socket_reader};
use crate::reporter::{spawn_reporter, Report};
use crate::sender::{spawn_sender, SenderConfig};
use crate::signal::{
    first_packet_gate, shutdown_channel, FirstPacketWaiter, ShutdownListener, ShutdownTrigger,
};
use crossbeam::channel;
use rtpmon_io::RtpSocket;
use rtpmon_protocol::{AnalyzerConfig, RunningStats, SharedStats, StreamAnalyzer};
use std::net::SocketAddr;
use std::thread::JoinHandle;
use std::time::Duration;

/// Records buffered between the socket reader and the analyzer
const RECORD_QUEUE_DEPTH: usize = 4096;

/// Requested socket receive buffer size
const RECV_BUFFER_SIZE: usize = 256 * 1024;

/// Default report interval
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

/// Probe configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Local bind address
    pub local: SocketAddr,
    /// Peer the outgoing stream is sent to
    pub remote: SocketAddr,
    /// Interval between reports
    pub report_interval: Duration,
    /// Outgoing stream parameters
    pub sender: SenderConfig,
    /// Receive window and jitter parameters
    pub analyzer: AnalyzerConfig,
}

impl ProbeConfig {
    /// Configuration with default stream parameters
    pub fn new(local: SocketAddr, remote: SocketAddr) -> Self {
        ProbeConfig {
            local,
            remote,
            report_interval: DEFAULT_REPORT_INTERVAL,
            sender: SenderConfig::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

/// Final results of a probe run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeSummary {
    /// Statistics at shutdown
    pub stats: RunningStats,
    /// Packets handed to the socket by the sender
    pub packets_sent: u64,
    /// Reports produced
    pub reports: u64,
    /// Window advances performed by the analyzer
    pub window_advances: u64,
}

/// A running probe
pub struct Probe {
    config: ProbeConfig,
    socket: RtpSocket,
    stats: SharedStats,
    waiter: Option<FirstPacketWaiter>,
    first_seen: bool,
    trigger: ShutdownTrigger,
    shutdown: ShutdownListener,
    reader: Option<JoinHandle<()>>,
    analyzer: Option<JoinHandle<StreamAnalyzer>>,
    reporter: Option<JoinHandle<u64>>,
    sender: Option<JoinHandle<u64>>,
}

impl Probe {
    /// Bind the local socket and start the receive path
    pub fn bind(config: ProbeConfig) -> Result<Self, ProbeError> {
        if !rtpmon_protocol::ReceiveWindow::is_valid_capacity(config.analyzer.capacity) {
            return Err(ProbeError::Invalid(format!(
                "window capacity {} must be even and within 2..=32768",
                config.analyzer.capacity
            )));
        }

        let socket = RtpSocket::bind(config.local)?;
        if let Err(e) = socket.set_recv_buffer_size(RECV_BUFFER_SIZE) {
            tracing::warn!("Could not raise receive buffer size: {}", e);
        }
        let local = socket.local_addr()?;
        tracing::info!(
            "Listening on {} (recv buffer {} bytes)",
            local,
            socket.recv_buffer_size().unwrap_or(0)
        );

        let stats = SharedStats::new();
        let analyzer = StreamAnalyzer::with_stats(config.analyzer, stats.clone());
        let (gate, waiter) = first_packet_gate();
        let (trigger, shutdown) = shutdown_channel();
        let (record_tx, record_rx) = channel::bounded(RECORD_QUEUE_DEPTH);

        let reader = spawn_socket_reader(socket.try_clone()?, record_tx, shutdown.clone())?;
        let analyzer = spawn_analyzer(analyzer, record_rx, gate, shutdown.clone())?;

        Ok(Probe {
            config,
            socket,
            stats,
            waiter: Some(waiter),
            first_seen: false,
            trigger,
            shutdown,
            reader: Some(reader),
            analyzer: Some(analyzer),
            reporter: None,
            sender: None,
        })
    }

    /// Address the probe is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, ProbeError> {
        Ok(self.socket.local_addr()?)
    }

    /// Probe configuration
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Handle to the running statistics
    pub fn stats(&self) -> SharedStats {
        self.stats.clone()
    }

    /// Block until the first packet has been analyzed
    ///
    /// Returns false if the receive path ended without seeing one.
    pub fn wait_for_first_packet(&mut self) -> bool {
        if let Some(waiter) = self.waiter.take() {
            self.first_seen = waiter.wait();
        }
        self.first_seen
    }

    /// Like [`Probe::wait_for_first_packet`], giving up after `timeout`
    pub fn wait_for_first_packet_timeout(&mut self, timeout: Duration) -> bool {
        if let Some(waiter) = self.waiter.take() {
            match waiter.wait_timeout(timeout) {
                Ok(fired) => self.first_seen = fired,
                Err(waiter) => self.waiter = Some(waiter),
            }
        }
        self.first_seen
    }

    /// Start the periodic reporter
    pub fn start_reporter<F>(&mut self, sink: F) -> Result<(), ProbeError>
    where
        F: FnMut(&Report) + Send + 'static,
    {
        if self.reporter.is_some() {
            return Err(ProbeError::AlreadyStarted("reporter"));
        }

        let handle = spawn_reporter(
            self.stats.clone(),
            self.config.report_interval,
            self.shutdown.clone(),
            sink,
        )?;
        self.reporter = Some(handle);
        Ok(())
    }

    /// Start sending the paced stream to the remote peer
    pub fn start_sender(&mut self) -> Result<(), ProbeError> {
        if self.sender.is_some() {
            return Err(ProbeError::AlreadyStarted("sender"));
        }

        let handle = spawn_sender(
            self.socket.try_clone()?,
            self.config.remote,
            self.config.sender.clone(),
            self.shutdown.clone(),
        )?;
        self.sender = Some(handle);
        Ok(())
    }

    /// Stop every task and collect the final results
    pub fn shutdown(mut self) -> Result<ProbeSummary, ProbeError> {
        tracing::debug!("Shutting down probe");
        self.trigger.trigger();

        let packets_sent = join_optional(self.sender.take(), "sender")?.unwrap_or(0);
        let reports = join_optional(self.reporter.take(), "reporter")?.unwrap_or(0);
        join_optional(self.reader.take(), "socket reader")?;
        let window_advances = join_optional(self.analyzer.take(), "analyzer")?
            .map(|analyzer| analyzer.advances())
            .unwrap_or(0);

        Ok(ProbeSummary {
            stats: self.stats.snapshot(),
            packets_sent,
            reports,
            window_advances,
        })
    }
}

fn join_optional<T>(
    handle: Option<JoinHandle<T>>,
    task: &'static str,
) -> Result<Option<T>, ProbeError> {
    match handle {
        Some(handle) => handle
            .join()
            .map(Some)
            .map_err(|_| ProbeError::Panicked(task)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtpmon_protocol::RtpHeader;
    use rtpmon_protocol::{RtpPacket, SeqNumber};

    fn loopback() -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }

    #[test]
    fn test_invalid_capacity_rejected() {
        let mut config = ProbeConfig::new(loopback(), loopback());
        config.analyzer.capacity = 7;
        assert!(matches!(Probe::bind(config), Err(ProbeError::Invalid(_))));
    }

    #[test]
    fn test_first_packet_opens_gate() {
        let mut probe = Probe::bind(ProbeConfig::new(loopback(), loopback())).unwrap();
        let target = probe.local_addr().unwrap();
        assert!(!probe.wait_for_first_packet_timeout(Duration::from_millis(10)));

        let peer = RtpSocket::bind(loopback()).unwrap();
        let packet = RtpPacket::new(
            RtpHeader::new(8, SeqNumber::new(5), 800, 9),
            bytes::Bytes::from_static(&[0; 160]),
        );
        peer.send_to(&packet.to_bytes(), target).unwrap();

        assert!(probe.wait_for_first_packet_timeout(Duration::from_secs(2)));
        assert!(probe.wait_for_first_packet());

        let summary = probe.shutdown().unwrap();
        assert_eq!(summary.stats.received, 1);
        assert_eq!(summary.stats.total, 1);
        assert_eq!(summary.packets_sent, 0);
    }

    #[test]
    fn test_tasks_start_once() {
        let mut probe = Probe::bind(ProbeConfig::new(loopback(), loopback())).unwrap();
        probe.start_reporter(|_| {}).unwrap();
        assert!(matches!(
            probe.start_reporter(|_| {}),
            Err(ProbeError::AlreadyStarted("reporter"))
        ));
        probe.shutdown().unwrap();
    }
}
