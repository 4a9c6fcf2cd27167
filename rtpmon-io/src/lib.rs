//! Probe I/O and Platform Abstraction
//!
//! This crate provides the UDP socket wrapper used to carry the RTP stream
//! and small timing utilities.

pub mod socket;
pub mod time;

pub use socket::{RtpSocket, SocketError};
pub use time::IdleTimer;
