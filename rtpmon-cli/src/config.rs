//! Configuration file support for the probe

use rtpmon::protocol::{AnalyzerConfig, JitterConfig};
use rtpmon::sender::{ramp_payload, SenderConfig, DEFAULT_PAYLOAD_SIZE};
use rtpmon::ProbeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Probe configuration as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Local IP address to bind
    #[serde(default = "default_local_addr")]
    pub local_addr: String,
    /// Local UDP port
    #[serde(default = "default_port")]
    pub local_port: u16,
    /// Remote IP address the stream is sent to
    #[serde(default = "default_remote_addr")]
    pub remote_addr: String,
    /// Remote UDP port
    #[serde(default = "default_port")]
    pub remote_port: u16,
    /// Wait for the first inbound packet before sending and reporting
    #[serde(default)]
    pub server: bool,
    /// Log per-pair diagnostics
    #[serde(default)]
    pub verbose: bool,
    /// Report interval in seconds
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    /// Packetization interval in milliseconds
    #[serde(default = "default_send_interval")]
    pub send_interval_ms: u64,
    /// Media clock rate in Hz
    #[serde(default = "default_clock_rate")]
    pub clock_rate_hz: u32,
    /// Receive window capacity in slots
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,
    /// Stop after this many seconds (0 runs until interrupted)
    #[serde(default)]
    pub duration_secs: u64,
}

fn default_local_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_remote_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    19080
}

fn default_report_interval() -> u64 {
    10
}

fn default_send_interval() -> u64 {
    20
}

fn default_clock_rate() -> u32 {
    8000
}

fn default_window_capacity() -> usize {
    200
}

impl Default for Config {
    fn default() -> Self {
        Config {
            local_addr: default_local_addr(),
            local_port: default_port(),
            remote_addr: default_remote_addr(),
            remote_port: default_port(),
            server: false,
            verbose: false,
            report_interval_secs: default_report_interval(),
            send_interval_ms: default_send_interval(),
            clock_rate_hz: default_clock_rate(),
            window_capacity: default_window_capacity(),
            duration_secs: 0,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Example configuration for the answering side of a probe pair
    pub fn example() -> Self {
        Config {
            remote_addr: "192.168.1.10".to_string(),
            server: true,
            report_interval_secs: 5,
            ..Config::default()
        }
    }

    /// Local bind address
    pub fn local(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr(&self.local_addr, self.local_port, "local")
    }

    /// Remote peer address
    pub fn remote(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr(&self.remote_addr, self.remote_port, "remote")
    }

    /// Report interval as Duration
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    /// Run time limit, if any
    pub fn duration(&self) -> Option<Duration> {
        (self.duration_secs > 0).then(|| Duration::from_secs(self.duration_secs))
    }

    /// Build the runtime configuration, validating every field
    pub fn to_probe_config(&self) -> Result<ProbeConfig, ConfigError> {
        if self.report_interval_secs == 0 {
            return Err(ConfigError::Invalid("report interval must be at least 1s".into()));
        }
        if self.send_interval_ms == 0 {
            return Err(ConfigError::Invalid("send interval must be at least 1ms".into()));
        }
        if self.clock_rate_hz == 0 {
            return Err(ConfigError::Invalid("clock rate must be non-zero".into()));
        }
        if !rtpmon::protocol::ReceiveWindow::is_valid_capacity(self.window_capacity) {
            return Err(ConfigError::Invalid(format!(
                "window capacity {} must be even and within 2..=32768",
                self.window_capacity
            )));
        }

        let sender = SenderConfig {
            interval: Duration::from_millis(self.send_interval_ms),
            clock_rate_hz: self.clock_rate_hz,
            payload: ramp_payload(DEFAULT_PAYLOAD_SIZE),
            ..SenderConfig::default()
        };
        let analyzer = AnalyzerConfig {
            capacity: self.window_capacity,
            jitter: JitterConfig {
                clock_rate_hz: self.clock_rate_hz,
                ..JitterConfig::default()
            },
        };

        Ok(ProbeConfig {
            local: self.local()?,
            remote: self.remote()?,
            report_interval: self.report_interval(),
            sender,
            analyzer,
        })
    }
}

fn socket_addr(ip: &str, port: u16, which: &str) -> Result<SocketAddr, ConfigError> {
    let ip: IpAddr = ip
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} address {:?} is not an IP address", which, ip)))?;
    Ok(SocketAddr::new(ip, port))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.local().unwrap(), "0.0.0.0:19080".parse().unwrap());
        assert_eq!(config.remote().unwrap(), "127.0.0.1:19080".parse().unwrap());
        assert_eq!(config.report_interval(), Duration::from_secs(10));
        assert_eq!(config.duration(), None);
        assert!(!config.server);
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config::example();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str("server = true\nremote_port = 20000\n").unwrap();
        assert!(parsed.server);
        assert_eq!(parsed.remote_port, 20000);
        assert_eq!(parsed.local_port, 19080);
        assert_eq!(parsed.window_capacity, 200);
    }

    #[test]
    fn test_probe_config() {
        let probe = Config::default().to_probe_config().unwrap();
        assert_eq!(probe.analyzer.capacity, 200);
        assert_eq!(probe.analyzer.jitter.clock_rate_hz, 8000);
        assert_eq!(probe.sender.samples_per_packet(), 160);
        assert_eq!(probe.sender.payload.len(), 160);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_addr = Config {
            remote_addr: "not-an-ip".to_string(),
            ..Config::default()
        };
        assert!(matches!(bad_addr.to_probe_config(), Err(ConfigError::Invalid(_))));

        let odd_window = Config {
            window_capacity: 201,
            ..Config::default()
        };
        assert!(matches!(odd_window.to_probe_config(), Err(ConfigError::Invalid(_))));

        let no_interval = Config {
            report_interval_secs: 0,
            ..Config::default()
        };
        assert!(matches!(no_interval.to_probe_config(), Err(ConfigError::Invalid(_))));
    }
}
