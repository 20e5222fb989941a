//! Paired lifecycle of latency monitoring and speed sampling

use log::info;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

use crate::collectors::collaborator::Collaborator;
use crate::collectors::latency_monitor::LatencyMonitor;
use crate::collectors::probe::{PingProbe, ProbeSender};
use crate::collectors::shutdown::StopReport;
use crate::collectors::speed_sampler::SpeedSampler;
use crate::collectors::throughput::{SpeedtestCli, ThroughputMeter};
use crate::config::Settings;
use crate::models::Device;

/// Stop outcome of both components, in the order they were stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStopReport {
    pub latency: StopReport,
    pub speed: StopReport,
}

/// Starts and stops the latency monitor and speed sampler as one unit
pub struct MonitoringSession {
    latency: Arc<LatencyMonitor>,
    speed: Arc<SpeedSampler>,
    /// Serializes lifecycle calls; holds whether a session is active
    active: AsyncMutex<bool>,
}

impl MonitoringSession {
    pub fn new(latency: Arc<LatencyMonitor>, speed: Arc<SpeedSampler>) -> Self {
        Self {
            latency,
            speed,
            active: AsyncMutex::new(false),
        }
    }

    /// Session wired to the system ping and, if installed, speedtest-cli
    pub fn from_settings(settings: &Settings) -> Self {
        let probe: Arc<dyn ProbeSender> = Arc::new(PingProbe::new());
        let meter = SpeedtestCli::detect(&settings.discovery.speedtest_path)
            .map(|meter| Arc::new(meter) as Arc<dyn ThroughputMeter>);
        let meter = Collaborator::from_detection(
            meter,
            format!("'{}' not found", settings.discovery.speedtest_path),
        );

        Self::new(
            Arc::new(LatencyMonitor::new(probe, settings.latency.monitor_config())),
            Arc::new(SpeedSampler::new(meter, settings.speed.sampler_config())),
        )
    }

    pub fn latency(&self) -> &Arc<LatencyMonitor> {
        &self.latency
    }

    pub fn speed(&self) -> &Arc<SpeedSampler> {
        &self.speed
    }

    /// Starts both components, stopping any session already running
    ///
    /// Returns the number of hosts being polled.
    pub async fn start_session(&self, devices: &[Device], speed_interval_seconds: u64) -> usize {
        let mut active = self.active.lock().await;
        if *active {
            self.stop_components().await;
        }

        let hosts = self.latency.start(devices).await;
        self.speed.start(speed_interval_seconds).await;
        *active = true;

        info!(
            "Monitoring session started ({} hosts, speed interval {}s)",
            hosts, speed_interval_seconds
        );
        hosts
    }

    /// Stops the latency monitor, then the speed sampler
    pub async fn stop_session(&self) -> SessionStopReport {
        let mut active = self.active.lock().await;
        if !*active {
            return SessionStopReport::default();
        }
        let report = self.stop_components().await;
        *active = false;
        info!("Monitoring session stopped");
        report
    }

    async fn stop_components(&self) -> SessionStopReport {
        let latency = self.latency.stop().await;
        let speed = self.speed.stop().await;
        SessionStopReport { latency, speed }
    }

    pub async fn is_active(&self) -> bool {
        *self.active.lock().await
    }
}
