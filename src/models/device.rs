use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder used when discovery cannot determine a name, MAC or vendor
pub const UNKNOWN_FIELD: &str = "Unknown";

/// A device found on the local network
///
/// Devices are produced by a scan and never mutated; a new scan yields a new set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// IPv4 address as reported by discovery (e.g. "192.168.1.20")
    pub address: String,
    /// Reverse-DNS name or a placeholder
    pub display_name: String,
    /// MAC address, "Unknown" when the sweep could not see it
    pub hardware_id: String,
    /// Vendor guess derived from the MAC prefix
    pub vendor: String,
    pub reachable: bool,
}

impl Device {
    /// Device reachable at `address` with every other field unknown
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: UNKNOWN_FIELD.to_string(),
            hardware_id: UNKNOWN_FIELD.to_string(),
            vendor: UNKNOWN_FIELD.to_string(),
            reachable: true,
        }
    }

    pub fn with_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Whether this device can be handed to the latency monitor
    pub fn is_monitorable(&self) -> bool {
        !self.address.trim().is_empty()
    }
}

/// Result of one discovery scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Range that was scanned, in CIDR notation
    pub range: String,
    pub devices: Vec<Device>,
    /// True when the devices were synthesized because no discovery tool was available
    pub demo_mode: bool,
    pub scanned_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn reachable_count(&self) -> usize {
        self.devices.iter().filter(|d| d.reachable).count()
    }
}
