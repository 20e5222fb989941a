//! Latency probe transport
//!
//! [`ProbeSender`] is the seam between the latency monitor and however a
//! single round-trip is actually measured. [`PingProbe`] shells out to the
//! system `ping` once per probe.

use async_trait::async_trait;
use log::{debug, trace};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::collectors::errors::ProbeError;
use crate::collectors::platform::{self, PING_PROGRAM};

/// Outcome of a successful probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeReply {
    /// Host answered and the round-trip time is known
    Measured(f64),
    /// Host answered but no round-trip time could be read from the reply
    Unmeasured,
}

/// Sends one latency probe to one address
#[async_trait]
pub trait ProbeSender: Send + Sync {
    async fn send(&self, address: &str, timeout: Duration) -> Result<ProbeReply, ProbeError>;
}

/// Probe backed by the platform `ping` binary
#[derive(Debug, Clone)]
pub struct PingProbe {
    program: String,
}

impl Default for PingProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl PingProbe {
    pub fn new() -> Self {
        Self {
            program: PING_PROGRAM.to_string(),
        }
    }

    /// Uses a different ping executable (e.g. an absolute path)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ProbeSender for PingProbe {
    async fn send(&self, address: &str, timeout: Duration) -> Result<ProbeReply, ProbeError> {
        let args = platform::ping_args(address, timeout);
        trace!("Probing {} with {} {:?}", address, self.program, args);

        let started = Instant::now();
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        // ping enforces its own wait, this only covers a wedged process
        let output = match tokio::time::timeout(timeout + Duration::from_secs(1), child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ProbeError::Transport(e.to_string())),
            Err(_) => return Err(ProbeError::Timeout(address.to_string())),
        };

        if !output.status.success() {
            debug!(
                "Probe to {} failed after {:?} (status={})",
                address,
                started.elapsed(),
                output.status
            );
            return Err(ProbeError::Unreachable(address.to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match platform::parse_ping_time(&stdout) {
            Some(ms) => Ok(ProbeReply::Measured(ms)),
            None => {
                debug!("Probe to {} succeeded but reply carried no time", address);
                Ok(ProbeReply::Unmeasured)
            }
        }
    }
}
