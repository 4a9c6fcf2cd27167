//! rtpmon - RTP stream quality probe
//!
//! Sends a paced G.711 RTP stream to a peer and reports jitter, clock skew
//! and packet loss of the stream it receives.

use clap::Parser;
use rtpmon::Probe;
use rtpmon_cli::{format_report, print_summary, Config};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// How often to log while waiting for the peer in server mode
const WAIT_LOG_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "rtpmon")]
#[command(about = "RTP stream jitter, skew and loss probe", long_about = None)]
struct Args {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local IPv4 address [default: 0.0.0.0]
    #[arg(long)]
    local_addr: Option<String>,

    /// Local UDP port [default: 19080]
    #[arg(long)]
    local_port: Option<u16>,

    /// Remote IPv4 address [default: 127.0.0.1]
    #[arg(long)]
    remote_addr: Option<String>,

    /// Remote UDP port [default: 19080]
    #[arg(long)]
    remote_port: Option<u16>,

    /// Verbose output (per-packet diagnostics)
    #[arg(short, long)]
    verbose: bool,

    /// Wait for the first packet from the peer before sending
    #[arg(long)]
    server: bool,

    /// Report interval in seconds [default: 10]
    #[arg(short, long)]
    interval: Option<u64>,

    /// Packetization interval in milliseconds [default: 20]
    #[arg(long)]
    send_interval_ms: Option<u64>,

    /// Stop after this many seconds, 0 runs until interrupted [default: 0]
    #[arg(short, long)]
    duration: Option<u64>,

    /// Write an example configuration file and exit
    #[arg(long, value_name = "PATH")]
    write_example_config: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(addr) = &self.local_addr {
            config.local_addr = addr.clone();
        }
        if let Some(port) = self.local_port {
            config.local_port = port;
        }
        if let Some(addr) = &self.remote_addr {
            config.remote_addr = addr.clone();
        }
        if let Some(port) = self.remote_port {
            config.remote_port = port;
        }
        if let Some(secs) = self.interval {
            config.report_interval_secs = secs;
        }
        if let Some(ms) = self.send_interval_ms {
            config.send_interval_ms = ms;
        }
        if let Some(secs) = self.duration {
            config.duration_secs = secs;
        }
        config.verbose |= self.verbose;
        config.server |= self.server;
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.write_example_config {
        Config::example().to_file(path)?;
        println!("Wrote example configuration to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    args.apply(&mut config);

    // Initialize logging; RUST_LOG takes precedence over --verbose
    let default_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!("rtpmon starting...");
    let probe_config = config.to_probe_config()?;
    let remote = probe_config.remote;
    let mut probe = Probe::bind(probe_config)?;

    if config.server {
        tracing::info!("Waiting for the first packet from a client...");
        while !probe.wait_for_first_packet_timeout(WAIT_LOG_INTERVAL) {
            tracing::info!("Still waiting for the first packet");
        }
        tracing::info!("Client stream detected");
    }

    let started = Instant::now();
    probe.start_reporter(|report| println!("{}", format_report(report)))?;
    probe.start_sender()?;
    tracing::info!("Streaming to {}", remote);

    match config.duration() {
        Some(limit) => thread::sleep(limit),
        None => loop {
            thread::park();
        },
    }

    let summary = probe.shutdown()?;
    print_summary(&summary, started.elapsed());

    Ok(())
}
