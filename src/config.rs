//! Layered configuration
//!
//! Built-in defaults, then an optional TOML file, then `NETPULSE__SECTION__KEY`
//! environment variables (e.g. `NETPULSE__LATENCY__POLL_INTERVAL_MS=500`).

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use log::debug;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::collectors::discovery::Cidr;
use crate::collectors::latency_monitor::LatencyMonitorConfig;
use crate::collectors::speed_sampler::SpeedSamplerConfig;

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "netpulse.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub latency: LatencySettings,
    pub speed: SpeedSettings,
    pub discovery: DiscoverySettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LatencySettings {
    pub poll_interval_ms: u64,
    pub probe_timeout_ms: u64,
    pub history_capacity: usize,
    pub stop_timeout_ms: u64,
}

impl Default for LatencySettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            probe_timeout_ms: 1_000,
            history_capacity: 100,
            stop_timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeedSettings {
    pub interval_seconds: u64,
    pub history_capacity: usize,
    pub measure_timeout_seconds: u64,
    pub stop_timeout_ms: u64,
}

impl Default for SpeedSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            history_capacity: 50,
            measure_timeout_seconds: 120,
            stop_timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Subnet to scan instead of the detected one
    pub range: Option<String>,
    pub nmap_path: String,
    pub speedtest_path: String,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            range: None,
            nmap_path: "nmap".to_string(),
            speedtest_path: "speedtest-cli".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from `path` (or `netpulse.toml` if present) and the environment
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("NETPULSE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    /// Parsed range override, if one is configured
    pub fn range_override(&self) -> Result<Option<Cidr>> {
        self.discovery
            .range
            .as_deref()
            .map(|range| {
                range
                    .parse::<Cidr>()
                    .with_context(|| format!("Invalid discovery range '{}'", range))
            })
            .transpose()
    }
}

impl LatencySettings {
    pub fn monitor_config(&self) -> LatencyMonitorConfig {
        LatencyMonitorConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            probe_timeout: Duration::from_millis(self.probe_timeout_ms),
            history_capacity: self.history_capacity,
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }
}

impl SpeedSettings {
    pub fn sampler_config(&self) -> SpeedSamplerConfig {
        SpeedSamplerConfig {
            history_capacity: self.history_capacity,
            measure_timeout: Duration::from_secs(self.measure_timeout_seconds),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_monitor_defaults() {
        let settings = Settings::default();
        assert_eq!(
            settings.latency.monitor_config(),
            LatencyMonitorConfig::default()
        );
        assert_eq!(settings.speed.sampler_config(), SpeedSamplerConfig::default());
        assert_eq!(settings.speed.interval_seconds, 60);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[latency]\npoll_interval_ms = 500\n\n[discovery]\nrange = \"10.0.0.0/24\""
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.latency.poll_interval_ms, 500);
        assert_eq!(settings.latency.history_capacity, 100);
        assert_eq!(
            settings.range_override().unwrap().map(|c| c.to_string()),
            Some("10.0.0.0/24".to_string())
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Settings::load(Some(Path::new("/nonexistent/netpulse.toml")));
        tokio_test::assert_err!(result);
    }

    #[test]
    fn test_invalid_range_override() {
        let settings = Settings {
            discovery: DiscoverySettings {
                range: Some("not-a-cidr".to_string()),
                ..DiscoverySettings::default()
            },
            ..Settings::default()
        };
        assert!(settings.range_override().is_err());
    }
}
