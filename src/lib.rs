//! netpulse: local network latency and internet throughput monitoring
//!
//! The crate discovers devices on the local subnet, polls each of them with
//! latency probes on their own background task, classifies every reply into a
//! [`models::QualityTier`] and keeps a bounded history per host. A separate
//! sampler measures internet throughput on a timer, falling back to clearly
//! flagged simulated samples when no real measurement tool is available.
//!
//! ```no_run
//! use netpulse::collectors::discovery::{detect_local_subnet, NetworkScanner};
//! use netpulse::config::Settings;
//! use netpulse::session::MonitoringSession;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let settings = Settings::load(None)?;
//! let mut scanner = NetworkScanner::detect(&settings.discovery);
//! let report = scanner.scan(&detect_local_subnet());
//!
//! let session = MonitoringSession::from_settings(&settings);
//! session.start_session(&report.devices, settings.speed.interval_seconds).await;
//! // ... read session.latency().snapshot() and session.speed().snapshot() ...
//! session.stop_session().await;
//! # Ok(())
//! # }
//! ```

pub mod collectors;
pub mod config;
pub mod models;
pub mod session;
pub mod storage;
