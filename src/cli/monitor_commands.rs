use anyhow::{Context, Result};
use chrono::Local;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep_until, Instant};

use netpulse::collectors::discovery::{detect_local_subnet, Cidr, NetworkScanner};
use netpulse::config::Settings;
use netpulse::models::ScanReport;
use netpulse::session::MonitoringSession;

use crate::cli::dashboard::Dashboard;
use crate::cli::formatting::{format_speed_sample, host_header, host_row, sorted_hosts};

pub struct MonitorCommandHandler {
    settings: Settings,
}

impl MonitorCommandHandler {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Range from the command line, else the configured override, else the detected subnet
    fn resolve_range(&self, range: Option<String>) -> Result<Cidr> {
        if let Some(range) = range {
            return range
                .parse::<Cidr>()
                .with_context(|| format!("Invalid range '{}'", range));
        }
        Ok(self
            .settings
            .range_override()?
            .unwrap_or_else(detect_local_subnet))
    }

    fn scan(&self, range: Option<String>) -> Result<ScanReport> {
        let range = self.resolve_range(range)?;
        let mut scanner = NetworkScanner::detect(&self.settings.discovery);
        println!("🔍 Scanning network: {range}");
        Ok(scanner.scan(&range))
    }

    pub fn handle_subnet_command(&self) -> Result<()> {
        println!("{}", detect_local_subnet());
        Ok(())
    }

    pub fn handle_scan_command(&self, range: Option<String>, json: bool) -> Result<()> {
        let report = self.scan(range)?;

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        if report.demo_mode {
            println!("⚠️  nmap not available: showing demo devices, not real scan results");
        }
        if report.devices.is_empty() {
            println!("No devices found on {}", report.range);
            return Ok(());
        }

        println!();
        println!(
            "{:<16} {:<28} {:<18} {:<24} {}",
            "IP Address", "Hostname", "MAC Address", "Vendor", "Status"
        );
        for device in &report.devices {
            println!(
                "{:<16} {:<28} {:<18} {:<24} {}",
                device.address,
                device.display_name,
                device.hardware_id,
                device.vendor,
                if device.reachable { "up" } else { "down" }
            );
        }
        println!();
        println!(
            "Total devices: {}  Active: {}",
            report.devices.len(),
            report.reachable_count()
        );
        Ok(())
    }

    pub async fn handle_speed_command(&self, json: bool) -> Result<()> {
        let session = MonitoringSession::from_settings(&self.settings);
        if !json {
            println!("🌐 Measuring internet speed...");
        }
        let sample = session.speed().run_once().await;

        if json {
            println!("{}", serde_json::to_string_pretty(&sample)?);
        } else {
            println!("{}", format_speed_sample(&sample));
        }
        Ok(())
    }

    pub async fn handle_monitor_command(
        &self,
        range: Option<String>,
        duration: Option<u64>,
        speed_interval: Option<u64>,
        refresh: u64,
    ) -> Result<()> {
        let report = self.scan(range)?;
        if report.demo_mode {
            println!("⚠️  Monitoring demo devices (nmap not available)");
        }

        let session = MonitoringSession::from_settings(&self.settings);
        let speed_interval = speed_interval.unwrap_or(self.settings.speed.interval_seconds);
        let hosts = session.start_session(&report.devices, speed_interval).await;
        println!("📊 Monitoring {hosts} devices, press Ctrl-C to stop");

        let deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));
        let until_deadline = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(until_deadline);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut ticker = interval(Duration::from_secs(refresh.max(1)));
        loop {
            tokio::select! {
                _ = ticker.tick() => print_status(&session),
                _ = &mut until_deadline => {
                    info!("Monitoring duration elapsed");
                    break;
                }
                _ = &mut ctrl_c => {
                    println!();
                    break;
                }
            }
        }

        let stopped = session.stop_session().await;
        print_status(&session);
        println!(
            "✅ Monitoring stopped ({} pollers stopped, {} detached)",
            stopped.latency.stopped, stopped.latency.detached
        );
        Ok(())
    }

    pub async fn handle_live_command(
        &self,
        range: Option<String>,
        speed_interval: Option<u64>,
        refresh_ms: u64,
    ) -> Result<()> {
        let report = self.scan(range)?;
        let session = Arc::new(MonitoringSession::from_settings(&self.settings));
        let speed_interval = speed_interval.unwrap_or(self.settings.speed.interval_seconds);
        session.start_session(&report.devices, speed_interval).await;

        let mut dashboard = Dashboard::new(Arc::clone(&session), report, refresh_ms);
        let result = dashboard.run().await;

        session.stop_session().await;
        result
    }
}

fn print_status(session: &MonitoringSession) {
    let snapshot = session.latency().snapshot();
    println!();
    println!("── {} ──", Local::now().format("%Y-%m-%d %H:%M:%S"));
    println!("{}", host_header());
    for record in sorted_hosts(&snapshot) {
        println!("{}", host_row(record));
    }
    match session.speed().latest() {
        Some(sample) => println!("Internet: {}", format_speed_sample(&sample)),
        None => println!("Internet: waiting for first speed sample"),
    }
}
