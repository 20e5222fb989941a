//! Error types for the measurement collaborators
//!
//! None of these ever escape a running session: probe errors become `Down`
//! samples, discovery and throughput errors select the documented fallbacks.

use std::net::Ipv4Addr;
use thiserror::Error;

/// Failure of a single latency probe
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No reply within the probe timeout
    #[error("probe to {0} timed out")]
    Timeout(String),

    /// The probe ran but the host did not answer
    #[error("host {0} is unreachable")]
    Unreachable(String),

    /// The probe could not be sent at all
    #[error("probe transport failed: {0}")]
    Transport(String),
}

/// Failure of the host-discovery sweep
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to run discovery tool: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("discovery tool exited with {status}: {stderr}")]
    ToolFailed { status: String, stderr: String },
}

/// Failure of a throughput measurement
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("failed to run throughput tool: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("throughput tool exited with {status}: {stderr}")]
    ToolFailed { status: String, stderr: String },

    #[error("unexpected throughput tool output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("throughput measurement exceeded {0:?}")]
    Timeout(std::time::Duration),
}

/// Failure to determine the local subnet
#[derive(Debug, Error)]
pub enum SubnetError {
    #[error("no default route: {0}")]
    NoDefaultRoute(std::io::Error),

    #[error("default route address {0} is not IPv4")]
    NotIpv4(std::net::IpAddr),

    #[error("failed to enumerate interfaces: {0}")]
    Interfaces(std::io::Error),

    #[error("no interface carries address {0}")]
    NoMatchingInterface(Ipv4Addr),
}

/// Invalid CIDR notation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CidrParseError {
    #[error("missing '/' in CIDR '{0}'")]
    MissingPrefix(String),

    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),

    #[error("invalid prefix length '{0}' (expected 0-32)")]
    InvalidPrefix(String),
}
