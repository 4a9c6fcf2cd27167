//! Report formatting

use chrono::{DateTime, Local};
use rtpmon::protocol::RunningStats;
use rtpmon::{ProbeSummary, Report};
use std::time::{Duration, SystemTime};

/// Layout of the wall-clock time at the start of a report line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Format a wall-clock time in local time
pub fn format_timestamp(at: SystemTime) -> String {
    DateTime::<Local>::from(at).format(TIMESTAMP_FORMAT).to_string()
}

/// Format duration in human-readable form
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Loss percentage, or `n/a` before anything was observed
pub fn format_loss(stats: &RunningStats) -> String {
    match stats.loss_percent() {
        Some(percent) => format!("{:.2}%", percent),
        None => "n/a".to_string(),
    }
}

/// One report line
pub fn format_report(report: &Report) -> String {
    let stats = &report.stats;
    format!(
        "{} [{}] maxJ: {:.2}, maxSkew: {:.2}, lost: {} ({}), total: {}",
        format_timestamp(report.at),
        format_duration(report.uptime),
        stats.max_jitter,
        stats.max_skew,
        stats.lost,
        format_loss(stats),
        stats.total
    )
}

/// Display the end-of-run summary
pub fn print_summary(summary: &ProbeSummary, elapsed: Duration) {
    let stats = &summary.stats;
    println!("\n=== Probe Summary ===");
    println!("Duration: {}", format_duration(elapsed));
    println!("Packets sent: {}", summary.packets_sent);
    println!("Packets received: {}", stats.received);
    println!("Sequence span: {}", stats.total);
    println!("Lost: {} ({})", stats.lost, format_loss(stats));
    println!("Late: {}", stats.late);
    println!("Duplicates: {}", stats.duplicates);
    println!("Max jitter: {:.2} ms", stats.max_jitter);
    println!("Max skew: {:.2} ms", stats.max_skew);
    println!("Window advances: {}", summary.window_advances);
}
