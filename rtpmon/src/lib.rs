//! RTP Stream Quality Probe
//!
//! Runtime for the probe: a receive path that feeds every inbound RTP packet
//! through the [`StreamAnalyzer`](rtpmon_protocol::StreamAnalyzer), a paced
//! sender producing the outgoing test stream, and a periodic reporter.
//!
//! # Example
//!
//! ```no_run
//! use rtpmon::{Probe, ProbeConfig};
//!
//! # fn main() -> Result<(), rtpmon::ProbeError> {
//! let config = ProbeConfig::new(
//!     "0.0.0.0:19080".parse().unwrap(),
//!     "127.0.0.1:19080".parse().unwrap(),
//! );
//! let mut probe = Probe::bind(config)?;
//! probe.start_reporter(|report| println!("{:?}", report.stats))?;
//! probe.start_sender()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod probe;
pub mod receiver;
pub mod reporter;
pub mod sender;
pub mod signal;

pub use error::ProbeError;
pub use probe::{Probe, ProbeConfig, ProbeSummary};
pub use reporter::Report;
pub use sender::{PacketSource, SenderConfig};
pub use signal::{first_packet_gate, shutdown_channel, FirstPacketGate, FirstPacketWaiter};

pub use rtpmon_io as io;
pub use rtpmon_protocol as protocol;
