//! Internet throughput measurement collaborator
//!
//! [`ThroughputMeter`] reports raw rates; conversion to Mbps, rounding and the
//! simulated fallback live in the speed sampler. [`SpeedtestCli`] drives the
//! `speedtest-cli` tool, which selects the best server, measures download,
//! then upload, and reports the server ping.

use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use std::process::{Command as StdCommand, Stdio};
use tokio::process::Command;

use crate::collectors::errors::MeasureError;

/// Raw result of one throughput measurement
#[derive(Debug, Clone, PartialEq)]
pub struct ThroughputReading {
    /// Download rate as reported by the tool, in units per second
    pub download_bps: f64,
    pub upload_bps: f64,
    pub ping_ms: f64,
    pub server_name: String,
}

/// Measures internet throughput once
#[async_trait]
pub trait ThroughputMeter: Send + Sync {
    async fn measure(&self) -> Result<ThroughputReading, MeasureError>;
}

/// Subset of `speedtest-cli --json` output
#[derive(Debug, Deserialize)]
struct SpeedtestJson {
    download: f64,
    upload: f64,
    ping: f64,
    server: SpeedtestServer,
}

#[derive(Debug, Deserialize)]
struct SpeedtestServer {
    #[serde(default)]
    name: String,
    #[serde(default)]
    sponsor: String,
}

/// Throughput meter backed by `speedtest-cli`
#[derive(Debug, Clone)]
pub struct SpeedtestCli {
    program: String,
}

impl SpeedtestCli {
    /// Returns the meter only if `program --version` runs successfully
    pub fn detect(program: &str) -> Option<Self> {
        let available = StdCommand::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);

        if available {
            info!("Throughput tool '{}' is available", program);
            Some(Self {
                program: program.to_string(),
            })
        } else {
            debug!("Throughput tool '{}' not found", program);
            None
        }
    }

    fn parse(stdout: &str) -> Result<ThroughputReading, MeasureError> {
        let json: SpeedtestJson = serde_json::from_str(stdout.trim())?;
        let server_name = match (json.server.sponsor.is_empty(), json.server.name.is_empty()) {
            (false, false) => format!("{} ({})", json.server.sponsor, json.server.name),
            (false, true) => json.server.sponsor,
            (true, _) => json.server.name,
        };
        Ok(ThroughputReading {
            download_bps: json.download,
            upload_bps: json.upload,
            ping_ms: json.ping,
            server_name,
        })
    }
}

#[async_trait]
impl ThroughputMeter for SpeedtestCli {
    async fn measure(&self) -> Result<ThroughputReading, MeasureError> {
        debug!("Running {} --json --secure", self.program);
        let output = Command::new(&self.program)
            .args(["--json", "--secure"])
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(MeasureError::ToolFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }
}
