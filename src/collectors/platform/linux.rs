use log::trace;
use std::time::Duration;

/// `ping -c 1 -W <seconds>`; iputils only accepts whole seconds, minimum 1
pub fn ping_args(address: &str, timeout: Duration) -> Vec<String> {
    let wait_secs = timeout.as_secs_f64().ceil().max(1.0) as u64;
    vec![
        "-c".to_string(),
        "1".to_string(),
        "-W".to_string(),
        wait_secs.to_string(),
        address.to_string(),
    ]
}

pub fn has_raw_socket_privileges() -> bool {
    let is_root = nix::unistd::geteuid().is_root();
    trace!("Linux privilege check: euid root = {}", is_root);
    is_root
}
