//! Runtime errors

use rtpmon_io::SocketError;
use thiserror::Error;

/// Errors raised while setting up or running a probe
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Socket error: {0}")]
    Socket(#[from] SocketError),

    #[error("Failed to spawn {task} thread: {source}")]
    Spawn {
        task: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} already started")]
    AlreadyStarted(&'static str),

    #[error("{0} thread panicked")]
    Panicked(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
