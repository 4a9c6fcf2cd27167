//! Paced RTP sender
//!
//! Emits one packet per tick. Packet `n` carries sequence `n mod 2^16`,
//! timestamp `n * samples_per_packet` (wrapping) and a fixed payload.

use crate::error::ProbeError;
use crate::signal::ShutdownListener;
use bytes::Bytes;
use crossbeam::channel;
use crossbeam::select;
use rtpmon_io::RtpSocket;
use rtpmon_protocol::packet::{RtpHeader, RtpPacket, PAYLOAD_TYPE_PCMA};
use rtpmon_protocol::SeqNumber;
use std::net::SocketAddr;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default packetization interval
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(20);

/// Default payload size in bytes (20 ms of 8 kHz G.711)
pub const DEFAULT_PAYLOAD_SIZE: usize = 160;

/// Sender parameters
#[derive(Debug, Clone)]
pub struct SenderConfig {
    /// Packetization interval
    pub interval: Duration,
    /// Media clock rate in Hz
    pub clock_rate_hz: u32,
    /// RTP payload type
    pub payload_type: u8,
    /// Synchronization source identifier
    pub ssrc: u32,
    /// Payload carried by every packet
    pub payload: Bytes,
}

impl SenderConfig {
    /// Media clock ticks covered by one packet
    pub fn samples_per_packet(&self) -> u32 {
        (self.clock_rate_hz as u128 * self.interval.as_micros() / 1_000_000) as u32
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        SenderConfig {
            interval: DEFAULT_SEND_INTERVAL,
            clock_rate_hz: 8000,
            payload_type: PAYLOAD_TYPE_PCMA,
            ssrc: default_ssrc(),
            payload: ramp_payload(DEFAULT_PAYLOAD_SIZE),
        }
    }
}

/// Payload `0, 1, 2, ...` of the given size
pub fn ramp_payload(size: usize) -> Bytes {
    (0..size).map(|i| i as u8).collect::<Vec<u8>>().into()
}

fn default_ssrc() -> u32 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    nanos ^ std::process::id().rotate_left(16)
}

/// Builds the outgoing packet sequence
#[derive(Debug, Clone)]
pub struct PacketSource {
    config: SenderConfig,
    samples_per_packet: u32,
    count: u32,
}

impl PacketSource {
    /// Create a new source starting at packet 0
    pub fn new(config: SenderConfig) -> Self {
        let samples_per_packet = config.samples_per_packet();
        PacketSource {
            config,
            samples_per_packet,
            count: 0,
        }
    }

    /// Build the next packet
    pub fn next_packet(&mut self) -> RtpPacket {
        let n = self.count;
        self.count = self.count.wrapping_add(1);

        let header = RtpHeader::new(
            self.config.payload_type,
            SeqNumber::new(n as u16),
            n.wrapping_mul(self.samples_per_packet),
            self.config.ssrc,
        );
        RtpPacket::new(header, self.config.payload.clone())
    }

    /// Number of packets built so far
    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Spawn the sender task
///
/// Returns the number of packets handed to the socket when the task ends on
/// shutdown. Send failures are logged and the stream continues.
pub fn spawn_sender(
    socket: RtpSocket,
    remote: SocketAddr,
    config: SenderConfig,
    shutdown: ShutdownListener,
) -> Result<JoinHandle<u64>, ProbeError> {
    if config.interval.is_zero() {
        return Err(ProbeError::Invalid("send interval must be non-zero".into()));
    }

    tracing::info!(
        "Sending to {} every {:?} (pt={}, ssrc={:#010x})",
        remote,
        config.interval,
        config.payload_type,
        config.ssrc
    );

    thread::Builder::new()
        .name("rtpmon-sender".into())
        .spawn(move || {
            let ticker = channel::tick(config.interval);
            let mut source = PacketSource::new(config);
            let mut sent = 0u64;

            loop {
                select! {
                    recv(ticker) -> _ => {
                        let packet = source.next_packet();
                        match socket.send_to(&packet.to_bytes(), remote) {
                            Ok(_) => sent += 1,
                            Err(e) => tracing::warn!("Send of seq={} failed: {}", packet.sequence(), e),
                        }
                    }
                    recv(shutdown.receiver()) -> _ => break,
                }
            }

            tracing::debug!("Sender stopped after {} packets", sent);
            sent
        })
        .map_err(|source| ProbeError::Spawn {
            task: "sender",
            source,
        })
}
