//! Formatting helpers for status output

use std::collections::HashMap;

use netpulse::models::{HostRecord, SpeedSample};

pub fn format_latency(elapsed_ms: Option<f64>) -> String {
    match elapsed_ms {
        Some(ms) => format!("{:.1} ms", ms),
        None => "N/A".to_string(),
    }
}

pub fn format_loss(rate: f64) -> String {
    format!("{:.0}%", rate * 100.0)
}

pub fn format_speed_sample(sample: &SpeedSample) -> String {
    format!(
        "↓ {:.2} Mbps  ↑ {:.2} Mbps  ping {:.2} ms  [{}]{}",
        sample.download_mbps,
        sample.upload_mbps,
        sample.ping_ms,
        sample.server_label,
        if sample.is_simulated { " (simulated)" } else { "" }
    )
}

/// Host records ordered by address for stable table output
pub fn sorted_hosts(snapshot: &HashMap<String, HostRecord>) -> Vec<&HostRecord> {
    let mut hosts: Vec<&HostRecord> = snapshot.values().collect();
    hosts.sort_by_key(|record| {
        record
            .address
            .parse::<std::net::Ipv4Addr>()
            .map(u32::from)
            .unwrap_or(u32::MAX)
    });
    hosts
}

/// One table row per host: name, address, tier, latest time, loss, estimated speed
pub fn host_row(record: &HostRecord) -> String {
    let latest = record.latest().and_then(|s| s.elapsed_ms);
    format!(
        "{:<20} {:<16} {:<10} {:>10} {:>6} {:>10}",
        truncate(&record.display_name, 20),
        record.address,
        record.current_tier.label().to_uppercase(),
        format_latency(latest),
        format_loss(record.loss_rate()),
        record.current_tier.estimated_link_speed()
    )
}

pub fn host_header() -> String {
    format!(
        "{:<20} {:<16} {:<10} {:>10} {:>6} {:>10}",
        "Hostname", "IP", "Status", "Latency", "Loss", "Est. Speed"
    )
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let cut: String = value.chars().take(width.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
