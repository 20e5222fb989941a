use std::time::Duration;

// Platform-specific probe plumbing
// Builds the system `ping` invocation for each operating system and answers
// whether the process holds the privileges a raw network sweep needs

/// Linux ping flags and privilege check
/// Root detection via `nix`
#[cfg(target_os = "linux")]
pub mod linux;

/// macOS ping flags and privilege check
/// `-W` takes milliseconds on BSD ping
#[cfg(target_os = "macos")]
pub mod macos;

/// Windows ping flags and privilege check
/// Elevation detected through `net session`
#[cfg(target_os = "windows")]
pub mod windows;

/// Program name of the system ping utility
pub const PING_PROGRAM: &str = "ping";

/// Arguments for a single echo request to `address` that gives up after `timeout`
pub fn ping_args(address: &str, timeout: Duration) -> Vec<String> {
    #[cfg(target_os = "linux")]
    {
        linux::ping_args(address, timeout)
    }

    #[cfg(target_os = "macos")]
    {
        macos::ping_args(address, timeout)
    }

    #[cfg(target_os = "windows")]
    {
        windows::ping_args(address, timeout)
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        let _ = timeout;
        vec!["-c".to_string(), "1".to_string(), address.to_string()]
    }
}

/// Whether raw sockets are usable (needed by nmap to report MAC addresses)
pub fn has_raw_socket_privileges() -> bool {
    #[cfg(target_os = "linux")]
    {
        linux::has_raw_socket_privileges()
    }

    #[cfg(target_os = "macos")]
    {
        macos::has_raw_socket_privileges()
    }

    #[cfg(target_os = "windows")]
    {
        windows::has_raw_socket_privileges()
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        false
    }
}

/// Extracts the round-trip time in milliseconds from ping output
///
/// Understands `time=12.3 ms` (Linux, macOS), `time=12ms` and `time<1ms` (Windows).
/// Returns `None` when no time is present, e.g. on localized output.
pub fn parse_ping_time(output: &str) -> Option<f64> {
    let start = output.find("time=").or_else(|| output.find("time<"))? + "time=".len();
    let digits: String = output[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_linux_output() {
        let output = "PING 192.168.1.1 (192.168.1.1) 56(84) bytes of data.\n\
            64 bytes from 192.168.1.1: icmp_seq=1 ttl=64 time=3.42 ms\n\n\
            --- 192.168.1.1 ping statistics ---\n\
            1 packets transmitted, 1 received, 0% packet loss, time 0ms\n";
        assert_eq!(parse_ping_time(output), Some(3.42));
    }

    #[test]
    fn test_parse_windows_output() {
        let output = "Reply from 10.0.0.1: bytes=32 time=17ms TTL=64";
        assert_eq!(parse_ping_time(output), Some(17.0));

        let sub_ms = "Reply from 10.0.0.1: bytes=32 time<1ms TTL=128";
        assert_eq!(parse_ping_time(sub_ms), Some(1.0));
    }

    #[test]
    fn test_parse_without_time() {
        assert_eq!(parse_ping_time("Antwort von 10.0.0.1: Bytes=32 Zeit=3ms"), None);
        assert_eq!(parse_ping_time(""), None);
        assert_eq!(parse_ping_time("time=ms"), None);
    }

    #[test]
    fn test_ping_args_target_address() {
        let args = ping_args("192.168.1.7", Duration::from_millis(1500));
        assert_eq!(args.last().map(String::as_str), Some("192.168.1.7"));
        assert!(args.iter().any(|a| a == "1"));
    }
}
