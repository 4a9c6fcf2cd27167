//! UDP socket wrapper for the RTP stream
//!
//! Sockets are configured through socket2 and then used as blocking std
//! sockets with a read timeout, so a receive loop can wake up periodically to
//! check for shutdown.

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use thiserror::Error;

/// Socket configuration errors
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl SocketError {
    /// Whether this error is a read timeout or would-block condition
    pub fn is_timeout(&self) -> bool {
        let SocketError::Io(e) = self;
        matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
    }
}

/// RTP socket wrapper
pub struct RtpSocket {
    inner: UdpSocket,
}

impl RtpSocket {
    /// Create a new socket bound to the given address
    pub fn bind(addr: SocketAddr) -> Result<Self, SocketError> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;

        tracing::debug!("Bound UDP socket to {}", addr);
        Ok(RtpSocket {
            inner: socket.into(),
        })
    }

    /// Set how long `recv_from` blocks before reporting a timeout
    ///
    /// `None` blocks indefinitely.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), SocketError> {
        self.inner.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Set the receive buffer size
    pub fn set_recv_buffer_size(&self, size: usize) -> Result<(), SocketError> {
        SockRef::from(&self.inner).set_recv_buffer_size(size)?;
        Ok(())
    }

    /// Get the receive buffer size
    pub fn recv_buffer_size(&self) -> Result<usize, SocketError> {
        Ok(SockRef::from(&self.inner).recv_buffer_size()?)
    }

    /// Get the local address this socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(self.inner.local_addr()?)
    }

    /// Send a datagram to the given address
    pub fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        Ok(self.inner.send_to(buf, target)?)
    }

    /// Receive a datagram
    ///
    /// Returns the number of bytes received and the source address. A read
    /// timeout surfaces as an error for which [`SocketError::is_timeout`]
    /// returns true.
    pub fn recv_from(&self, buf: &mut [u8]) -> Result<(usize, SocketAddr), SocketError> {
        Ok(self.inner.recv_from(buf)?)
    }

    /// Try to clone the socket (shares the underlying descriptor)
    pub fn try_clone(&self) -> Result<Self, SocketError> {
        Ok(RtpSocket {
            inner: self.inner.try_clone()?,
        })
    }
}
