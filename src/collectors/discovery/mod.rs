//! Device discovery on the local network
//!
//! [`NetworkScanner`] delegates to a host-discovery tool when one was found at
//! startup, and otherwise synthesizes a small, flagged demo device set from the
//! scanned range so the rest of the pipeline still has something to monitor.

pub mod nmap;
pub mod subnet;

use chrono::Utc;
use log::{error, info, warn};

pub use nmap::NmapDiscovery;
pub use subnet::{
    detect_local_subnet, detect_local_subnet_with, Cidr, InterfaceAddress, InterfaceLookup,
    SystemInterfaces, FALLBACK_SUBNET,
};

use crate::collectors::collaborator::Collaborator;
use crate::collectors::errors::DiscoveryError;
use crate::config::DiscoverySettings;
use crate::models::{Device, ScanReport};

/// Vendor reported for every synthesized device
pub const DEMO_VENDOR: &str = "Demo";

/// Demo devices as (host offset, name, MAC)
const DEMO_HOSTS: [(u32, &str, &str); 4] = [
    (1, "router", "02:00:00:00:00:01"),
    (10, "desktop", "02:00:00:00:00:0a"),
    (20, "laptop", "02:00:00:00:00:14"),
    (30, "phone", "02:00:00:00:00:1e"),
];

/// Sweeps a range for reachable hosts
pub trait HostDiscovery: Send + Sync {
    fn discover(&self, range: &Cidr) -> Result<Vec<Device>, DiscoveryError>;
}

/// Scans subnets and caches the latest report
pub struct NetworkScanner {
    discovery: Collaborator<Box<dyn HostDiscovery>>,
    last_report: Option<ScanReport>,
}

impl NetworkScanner {
    pub fn new(discovery: Collaborator<Box<dyn HostDiscovery>>) -> Self {
        if let Collaborator::Unavailable(reason) = &discovery {
            warn!("No discovery tool ({}), scans will return demo devices", reason);
        }
        Self {
            discovery,
            last_report: None,
        }
    }

    /// Resolves the configured nmap binary once
    pub fn detect(settings: &DiscoverySettings) -> Self {
        let discovery = NmapDiscovery::detect(&settings.nmap_path)
            .map(|nmap| Box::new(nmap) as Box<dyn HostDiscovery>);
        Self::new(Collaborator::from_detection(
            discovery,
            format!("'{}' not found", settings.nmap_path),
        ))
    }

    pub fn is_demo(&self) -> bool {
        !self.discovery.is_available()
    }

    /// Scans `range`, replacing the cached report
    pub fn scan(&mut self, range: &Cidr) -> ScanReport {
        let (devices, demo_mode) = match &self.discovery {
            Collaborator::Available(discovery) => match discovery.discover(range) {
                Ok(devices) => (devices, false),
                Err(e) => {
                    error!("Scan of {} failed: {}", range, e);
                    (Vec::new(), false)
                }
            },
            Collaborator::Unavailable(_) => (demo_devices(range), true),
        };

        info!(
            "Scan of {} found {} devices{}",
            range,
            devices.len(),
            if demo_mode { " (demo mode)" } else { "" }
        );

        let report = ScanReport {
            range: range.to_string(),
            devices,
            demo_mode,
            scanned_at: Utc::now(),
        };
        self.last_report = Some(report.clone());
        report
    }

    pub fn last_report(&self) -> Option<&ScanReport> {
        self.last_report.as_ref()
    }
}

/// Deterministic demo device set derived from the range's base address
pub fn demo_devices(range: &Cidr) -> Vec<Device> {
    DEMO_HOSTS
        .iter()
        .map(|(offset, name, mac)| Device {
            address: range.host(*offset).to_string(),
            display_name: (*name).to_string(),
            hardware_id: (*mac).to_string(),
            vendor: DEMO_VENDOR.to_string(),
            reachable: true,
        })
        .collect()
}
