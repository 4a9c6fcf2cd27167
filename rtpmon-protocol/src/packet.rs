//! RTP Packet Structures and Serialization
//!
//! The probe stream is carried as RTP (RFC 3550) over UDP. Each packet has a
//! 12-byte fixed header, an optional CSRC list and header extension, and the
//! media payload. Only the fields the analyzer needs are surfaced; CSRCs and
//! extensions are skipped on decode and never written on encode.

use crate::sequence::SeqNumber;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::time::Instant;
use thiserror::Error;

/// Size of the fixed RTP header in bytes
pub const HEADER_SIZE: usize = 12;

/// RTP protocol version carried in the top two bits
pub const RTP_VERSION: u8 = 2;

/// Static payload type for G.711 A-law (PCMA)
pub const PAYLOAD_TYPE_PCMA: u8 = 8;

const VERSION_SHIFT: u8 = 6;
const PADDING_FLAG: u8 = 0x20;
const EXTENSION_FLAG: u8 = 0x10;
const CSRC_COUNT_MASK: u8 = 0x0F;
const MARKER_FLAG: u8 = 0x80;
const PAYLOAD_TYPE_MASK: u8 = 0x7F;

/// Fixed RTP header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    /// Marker bit
    pub marker: bool,
    /// Payload type (7 bits)
    pub payload_type: u8,
    /// Sequence number
    pub sequence: SeqNumber,
    /// Media timestamp in clock-rate ticks
    pub timestamp: u32,
    /// Synchronization source identifier
    pub ssrc: u32,
}

impl RtpHeader {
    /// Create a new header with the marker bit cleared
    pub fn new(payload_type: u8, sequence: SeqNumber, timestamp: u32, ssrc: u32) -> Self {
        RtpHeader {
            marker: false,
            payload_type: payload_type & PAYLOAD_TYPE_MASK,
            sequence,
            timestamp,
            ssrc,
        }
    }

    /// Serialize the fixed header (network byte order)
    pub fn to_bytes(&self, buf: &mut BytesMut) {
        buf.put_u8(RTP_VERSION << VERSION_SHIFT);
        let mut second = self.payload_type & PAYLOAD_TYPE_MASK;
        if self.marker {
            second |= MARKER_FLAG;
        }
        buf.put_u8(second);
        buf.put_u16(self.sequence.as_raw());
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
    }
}

/// RTP packet: header plus payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPacket {
    /// Packet header
    pub header: RtpHeader,
    /// Payload data
    pub payload: Bytes,
}

impl RtpPacket {
    /// Create a new packet
    pub fn new(header: RtpHeader, payload: Bytes) -> Self {
        RtpPacket { header, payload }
    }

    /// Get the sequence number
    #[inline]
    pub fn sequence(&self) -> SeqNumber {
        self.header.sequence
    }

    /// Get the media timestamp
    #[inline]
    pub fn timestamp(&self) -> u32 {
        self.header.timestamp
    }

    /// Total size of the packet on the wire
    pub fn size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    /// Serialize the packet to bytes
    pub fn to_bytes(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());
        self.header.to_bytes(&mut buf);
        buf.put_slice(&self.payload);
        buf
    }

    /// Parse a packet from a received datagram
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < HEADER_SIZE {
            return Err(PacketError::InsufficientData {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = bytes;
        let first = buf.get_u8();
        let second = buf.get_u8();

        let version = first >> VERSION_SHIFT;
        if version != RTP_VERSION {
            return Err(PacketError::UnsupportedVersion(version));
        }

        let header = RtpHeader {
            marker: (second & MARKER_FLAG) != 0,
            payload_type: second & PAYLOAD_TYPE_MASK,
            sequence: SeqNumber::new(buf.get_u16()),
            timestamp: buf.get_u32(),
            ssrc: buf.get_u32(),
        };

        let mut offset = HEADER_SIZE + (first & CSRC_COUNT_MASK) as usize * 4;
        if bytes.len() < offset {
            return Err(PacketError::Truncated("CSRC list"));
        }

        if (first & EXTENSION_FLAG) != 0 {
            if bytes.len() < offset + 4 {
                return Err(PacketError::Truncated("header extension"));
            }
            let words = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
            offset += 4 + words * 4;
            if bytes.len() < offset {
                return Err(PacketError::Truncated("header extension"));
            }
        }

        let mut end = bytes.len();
        if (first & PADDING_FLAG) != 0 {
            let padding = bytes[end - 1] as usize;
            if padding == 0 || offset + padding > end {
                return Err(PacketError::InvalidPadding(padding));
            }
            end -= padding;
        }

        Ok(RtpPacket {
            header,
            payload: Bytes::copy_from_slice(&bytes[offset..end]),
        })
    }
}

/// One observed arrival
///
/// Built by the receive path from a decoded packet and the local time at
/// which the datagram was read. Dropping a record frees its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketRecord {
    /// Sender-assigned sequence number
    pub sequence: SeqNumber,
    /// Sender-assigned media timestamp (clock-rate ticks)
    pub media_timestamp: u32,
    /// Local receipt time
    pub arrival: Instant,
    /// Payload bytes as received
    pub payload: Bytes,
}

impl PacketRecord {
    /// Create a record without payload
    pub fn new(sequence: SeqNumber, media_timestamp: u32, arrival: Instant) -> Self {
        PacketRecord {
            sequence,
            media_timestamp,
            arrival,
            payload: Bytes::new(),
        }
    }

    /// Create a record from a decoded packet and its arrival time
    pub fn from_packet(packet: RtpPacket, arrival: Instant) -> Self {
        PacketRecord {
            sequence: packet.header.sequence,
            media_timestamp: packet.header.timestamp,
            arrival,
            payload: packet.payload,
        }
    }
}

/// Packet parsing errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("Insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("Unsupported RTP version: {0}")]
    UnsupportedVersion(u8),

    #[error("Packet truncated inside {0}")]
    Truncated(&'static str),

    #[error("Invalid padding length: {0}")]
    InvalidPadding(usize),
}
