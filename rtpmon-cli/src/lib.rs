//! rtpmon CLI Library
//!
//! Configuration file handling and report formatting for the `rtpmon` binary.

pub mod config;
pub mod stats;

pub use config::{Config, ConfigError};
pub use stats::{format_duration, format_loss, format_report, format_timestamp, print_summary};
