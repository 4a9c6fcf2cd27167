//! Periodic statistics reporter
//!
//! Wakes on a fixed interval, snapshots the shared statistics and hands the
//! snapshot to a sink. The reporter never writes to the statistics.

use crate::error::ProbeError;
use crate::signal::ShutdownListener;
use crossbeam::channel;
use crossbeam::select;
use rtpmon_protocol::{RunningStats, SharedStats};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

/// One periodic report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Report {
    /// Statistics at the time of the tick
    pub stats: RunningStats,
    /// Time since the reporter started
    pub uptime: Duration,
    /// Wall-clock time of the tick
    pub at: SystemTime,
}

/// Spawn the reporter task
///
/// `sink` is called once per tick. Returns the number of reports produced
/// when the task ends on shutdown.
pub fn spawn_reporter<F>(
    stats: SharedStats,
    interval: Duration,
    shutdown: ShutdownListener,
    mut sink: F,
) -> Result<JoinHandle<u64>, ProbeError>
where
    F: FnMut(&Report) + Send + 'static,
{
    if interval.is_zero() {
        return Err(ProbeError::Invalid("report interval must be non-zero".into()));
    }

    thread::Builder::new()
        .name("rtpmon-reporter".into())
        .spawn(move || {
            let started = Instant::now();
            let ticker = channel::tick(interval);
            let mut reports = 0u64;

            loop {
                select! {
                    recv(ticker) -> _ => {
                        let report = Report {
                            stats: stats.snapshot(),
                            uptime: started.elapsed(),
                            at: SystemTime::now(),
                        };
                        sink(&report);
                        reports += 1;
                    }
                    recv(shutdown.receiver()) -> _ => break,
                }
            }

            reports
        })
        .map_err(|source| ProbeError::Spawn {
            task: "reporter",
            source,
        })
}
