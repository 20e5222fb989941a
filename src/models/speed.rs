use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server label carried by every simulated sample
pub const SIMULATED_SERVER_LABEL: &str = "simulated";

/// One internet throughput measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    pub timestamp: DateTime<Utc>,
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub ping_ms: f64,
    /// Measurement server, or "simulated"
    pub server_label: String,
    /// True only when no real measurement could be obtained
    pub is_simulated: bool,
}

impl SpeedSample {
    pub fn simulated(
        timestamp: DateTime<Utc>,
        download_mbps: f64,
        upload_mbps: f64,
        ping_ms: f64,
    ) -> Self {
        Self {
            timestamp,
            download_mbps,
            upload_mbps,
            ping_ms,
            server_label: SIMULATED_SERVER_LABEL.to_string(),
            is_simulated: true,
        }
    }
}
