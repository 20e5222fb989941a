use log::{debug, info, trace, warn};
use std::process::{Command, Stdio};

use super::subnet::Cidr;
use super::HostDiscovery;
use crate::collectors::errors::DiscoveryError;
use crate::collectors::platform;
use crate::models::device::UNKNOWN_FIELD;
use crate::models::Device;

/// Ping sweep through `nmap -sn`
#[derive(Debug, Clone)]
pub struct NmapDiscovery {
    program: String,
    privileged: bool,
}

impl NmapDiscovery {
    /// Returns the sweep only if `program --version` runs successfully
    pub fn detect(program: &str) -> Option<Self> {
        let available = Command::new(program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);

        if !available {
            debug!("Discovery tool '{}' not found", program);
            return None;
        }

        let privileged = platform::has_raw_socket_privileges();
        if !privileged {
            warn!("Running without raw socket privileges: nmap will not report MAC addresses or vendors");
        }
        info!("Discovery tool '{}' is available", program);
        Some(Self {
            program: program.to_string(),
            privileged,
        })
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }
}

impl HostDiscovery for NmapDiscovery {
    fn discover(&self, range: &Cidr) -> Result<Vec<Device>, DiscoveryError> {
        let target = range.to_string();
        debug!("Running {} -sn -T5 {}", self.program, target);

        let output = Command::new(&self.program)
            .args(["-sn", "-T5", &target])
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(DiscoveryError::ToolFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(parse_nmap_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parses nmap's normal `-sn` output into devices
///
/// Each host starts with `Nmap scan report for NAME (IP)` or `... for IP`;
/// an optional `MAC Address: XX:XX:.. (Vendor)` line follows.
pub fn parse_nmap_output(output: &str) -> Vec<Device> {
    const REPORT_PREFIX: &str = "Nmap scan report for ";
    const MAC_PREFIX: &str = "MAC Address: ";

    let mut devices: Vec<Device> = Vec::new();
    for line in output.lines().map(str::trim) {
        if let Some(target) = line.strip_prefix(REPORT_PREFIX) {
            let (name, address) = match target.rsplit_once(" (") {
                Some((name, rest)) => (name.to_string(), rest.trim_end_matches(')').to_string()),
                None => (UNKNOWN_FIELD.to_string(), target.to_string()),
            };
            trace!("nmap host {} ({})", address, name);
            devices.push(Device::new(address).with_name(name));
        } else if let Some(mac_line) = line.strip_prefix(MAC_PREFIX) {
            let Some(device) = devices.last_mut() else {
                continue;
            };
            let (mac, vendor) = match mac_line.split_once(" (") {
                Some((mac, vendor)) => (mac, vendor.trim_end_matches(')')),
                None => (mac_line, UNKNOWN_FIELD),
            };
            device.hardware_id = mac.to_string();
            device.vendor = vendor.to_string();
        }
    }
    devices
}
