use log::{debug, trace};
use std::process::Command;
use std::time::Duration;

/// `ping -n 1 -w <milliseconds>`
pub fn ping_args(address: &str, timeout: Duration) -> Vec<String> {
    let wait_ms = timeout.as_millis().max(1);
    vec![
        "-n".to_string(),
        "1".to_string(),
        "-w".to_string(),
        wait_ms.to_string(),
        address.to_string(),
    ]
}

/// `net session` only succeeds from an elevated prompt
pub fn has_raw_socket_privileges() -> bool {
    match Command::new("net").arg("session").output() {
        Ok(output) => {
            trace!("Windows privilege check: net session status {}", output.status);
            output.status.success()
        }
        Err(e) => {
            debug!("Failed to check administrator privileges: {}", e);
            false
        }
    }
}
