use log::trace;
use std::time::Duration;

/// `ping -c 1 -W <milliseconds>`
pub fn ping_args(address: &str, timeout: Duration) -> Vec<String> {
    let wait_ms = timeout.as_millis().max(1);
    vec![
        "-c".to_string(),
        "1".to_string(),
        "-W".to_string(),
        wait_ms.to_string(),
        address.to_string(),
    ]
}

pub fn has_raw_socket_privileges() -> bool {
    let uid = unsafe { libc::getuid() };
    trace!("macOS privilege check: uid = {}", uid);
    uid == 0
}
