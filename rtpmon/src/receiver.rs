//! Receive path
//!
//! Two tasks: a socket reader that turns datagrams into timestamped
//! [`PacketRecord`]s, and the analyzer consumer that processes them strictly
//! in arrival order until shutdown.

use crate::error::ProbeError;
use crate::signal::{FirstPacketGate, ShutdownListener};
use crossbeam::channel::{Receiver, Sender};
use crossbeam::select;
use rtpmon_io::{IdleTimer, RtpSocket};
use rtpmon_protocol::{Arrival, PacketRecord, RtpPacket, StreamAnalyzer};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Largest datagram the reader accepts
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// How often the reader wakes up to check for shutdown
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Silence after which the reader warns about a stalled stream
const STALL_WARNING: Duration = Duration::from_secs(5);

/// Spawn the socket reader task
///
/// Undecodable datagrams are logged and skipped. The task ends on shutdown or
/// when the record channel's consumer has gone away.
pub fn spawn_socket_reader(
    socket: RtpSocket,
    records: Sender<PacketRecord>,
    shutdown: ShutdownListener,
) -> Result<JoinHandle<()>, ProbeError> {
    socket.set_read_timeout(Some(READ_TIMEOUT))?;

    thread::Builder::new()
        .name("rtpmon-reader".into())
        .spawn(move || read_loop(socket, records, shutdown))
        .map_err(|source| ProbeError::Spawn {
            task: "socket reader",
            source,
        })
}

fn read_loop(socket: RtpSocket, records: Sender<PacketRecord>, shutdown: ShutdownListener) {
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
    let mut idle = IdleTimer::new(STALL_WARNING);
    let mut seen_any = false;

    while !shutdown.is_triggered() {
        match socket.recv_from(&mut buffer) {
            Ok((n, from)) => {
                let arrival = Instant::now();
                match RtpPacket::from_bytes(&buffer[..n]) {
                    Ok(packet) => {
                        if !seen_any {
                            tracing::info!("Receiving RTP stream from {}", from);
                            seen_any = true;
                        }
                        idle.touch();
                        if records.send(PacketRecord::from_packet(packet, arrival)).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Dropping datagram from {}: {}", from, e),
                }
            }
            Err(e) if e.is_timeout() => {
                if let Some(silence) = idle.check().filter(|_| seen_any) {
                    tracing::warn!("No packets received for {:.1}s", silence.as_secs_f64());
                }
            }
            Err(e) => tracing::error!("Receive error: {}", e),
        }
    }

    tracing::debug!("Socket reader stopped");
}

/// Spawn the analyzer consumer task
///
/// Fires `gate` when the first packet arrives. Returns the analyzer when the
/// task ends, either on shutdown or when the record channel closes.
pub fn spawn_analyzer(
    analyzer: StreamAnalyzer,
    records: Receiver<PacketRecord>,
    gate: FirstPacketGate,
    shutdown: ShutdownListener,
) -> Result<JoinHandle<StreamAnalyzer>, ProbeError> {
    thread::Builder::new()
        .name("rtpmon-analyzer".into())
        .spawn(move || analyze_loop(analyzer, records, gate, shutdown))
        .map_err(|source| ProbeError::Spawn {
            task: "analyzer",
            source,
        })
}

fn analyze_loop(
    mut analyzer: StreamAnalyzer,
    records: Receiver<PacketRecord>,
    mut gate: FirstPacketGate,
    shutdown: ShutdownListener,
) -> StreamAnalyzer {
    loop {
        select! {
            recv(records) -> msg => match msg {
                Ok(record) => {
                    if analyzer.on_arrival(record) == Arrival::First {
                        gate.fire();
                    }
                }
                Err(_) => break,
            },
            recv(shutdown.receiver()) -> _ => break,
        }
    }

    tracing::debug!("Analyzer stopped after {} window advances", analyzer.advances());
    analyzer
}
