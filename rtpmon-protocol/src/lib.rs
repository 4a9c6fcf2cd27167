//! RTP Stream Quality Core
//!
//! This crate implements the sliding-window packet accounting engine behind
//! the probe: wraparound-aware sequence numbers, the RTP packet codec, the
//! receive window with half-capacity advancement, gap detection, the jitter
//! and skew estimator, and the shared running statistics.

pub mod analyzer;
pub mod jitter;
pub mod loss;
pub mod packet;
pub mod sequence;
pub mod stats;
pub mod window;

pub use analyzer::{AnalyzerConfig, Arrival, StreamAnalyzer};
pub use jitter::{JitterConfig, JitterEstimator, JitterSample};
pub use loss::PairVerdict;
pub use packet::{PacketError, PacketRecord, RtpHeader, RtpPacket};
pub use sequence::SeqNumber;
pub use stats::{RunningStats, SharedStats};
pub use window::ReceiveWindow;
