//! Continuous per-host latency monitoring
//!
//! Each monitored address gets its own tokio task that probes, classifies and
//! records in a loop until told to stop. The task is the only writer of its
//! host's record; readers go through [`LatencyMonitor::snapshot`], which copies
//! every record under its lock so a half-written sample is never observed.
//!
//! `start` and `stop` are serialized by an async lifecycle lock, and `start`
//! always stops the previous set of pollers first, so at most one task polls
//! any address at a time.

use chrono::Utc;
use log::{debug, error, info, trace, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::collectors::probe::{ProbeReply, ProbeSender};
use crate::collectors::shutdown::{StopController, StopReport, StopSignal};
use crate::models::{Device, HostRecord, LatencySample};

/// Extra time granted to a probe collaborator beyond its own timeout
const PROBE_GRACE: Duration = Duration::from_millis(500);

/// Tuning for the latency monitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyMonitorConfig {
    /// Pause between the end of one probe and the start of the next
    pub poll_interval: Duration,
    /// Timeout handed to the probe sender
    pub probe_timeout: Duration,
    /// Samples retained per host
    pub history_capacity: usize,
    /// Upper bound on how long `stop` waits for tasks to exit
    pub stop_timeout: Duration,
}

impl Default for LatencyMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            probe_timeout: Duration::from_secs(1),
            history_capacity: 100,
            stop_timeout: Duration::from_secs(3),
        }
    }
}

/// A record plus the flag that closes it to writers once its session has stopped
#[derive(Debug)]
struct HostSlot {
    record: HostRecord,
    sealed: bool,
}

type SharedSlot = Arc<Mutex<HostSlot>>;

struct PollerSet {
    controller: StopController,
    tasks: Vec<(String, JoinHandle<()>)>,
}

/// Owns one polling task per monitored host
pub struct LatencyMonitor {
    probe: Arc<dyn ProbeSender>,
    config: LatencyMonitorConfig,
    hosts: RwLock<HashMap<String, SharedSlot>>,
    pollers: AsyncMutex<Option<PollerSet>>,
}

impl LatencyMonitor {
    pub fn new(probe: Arc<dyn ProbeSender>, config: LatencyMonitorConfig) -> Self {
        Self {
            probe,
            config,
            hosts: RwLock::new(HashMap::new()),
            pollers: AsyncMutex::new(None),
        }
    }

    pub fn config(&self) -> &LatencyMonitorConfig {
        &self.config
    }

    /// Replaces any running session with one polling task per device
    ///
    /// Devices with a blank address are skipped and duplicate addresses are
    /// polled once. Returns the number of tasks spawned.
    pub async fn start(&self, devices: &[Device]) -> usize {
        let mut pollers = self.pollers.lock().await;
        let previous = self.stop_locked(&mut pollers).await;
        if previous.stopped + previous.detached > 0 {
            debug!(
                "Replaced previous latency session (stopped={}, detached={})",
                previous.stopped, previous.detached
            );
        }

        let mut slots: HashMap<String, SharedSlot> = HashMap::new();
        for device in devices.iter().filter(|d| d.is_monitorable()) {
            let address = device.address.trim().to_string();
            if slots.contains_key(&address) {
                debug!("Skipping duplicate device address {}", address);
                continue;
            }
            let record = HostRecord::new(
                address.clone(),
                device.display_name.clone(),
                self.config.history_capacity,
            );
            slots.insert(
                address,
                Arc::new(Mutex::new(HostSlot {
                    record,
                    sealed: false,
                })),
            );
        }

        {
            let mut hosts = self.hosts.write().unwrap_or_else(|p| p.into_inner());
            *hosts = slots.clone();
        }

        let controller = StopController::new();
        let mut tasks = Vec::with_capacity(slots.len());
        for (address, slot) in slots {
            let handle = tokio::spawn(poll_host(
                address.clone(),
                slot,
                Arc::clone(&self.probe),
                self.config,
                controller.subscribe(),
            ));
            tasks.push((address, handle));
        }

        let spawned = tasks.len();
        info!(
            "Latency monitoring started for {} hosts (interval={:?}, history={})",
            spawned, self.config.poll_interval, self.config.history_capacity
        );
        *pollers = Some(PollerSet { controller, tasks });
        spawned
    }

    /// Signals every polling task and waits up to `stop_timeout` for them to exit
    ///
    /// Tasks finish their current probe before noticing the signal. Any task
    /// still running at the deadline is detached rather than aborted; its
    /// record is sealed regardless, so nothing is appended after this returns.
    pub async fn stop(&self) -> StopReport {
        let mut pollers = self.pollers.lock().await;
        self.stop_locked(&mut pollers).await
    }

    async fn stop_locked(&self, pollers: &mut Option<PollerSet>) -> StopReport {
        let Some(set) = pollers.take() else {
            return StopReport::default();
        };

        set.controller.stop();
        let deadline = Instant::now() + self.config.stop_timeout;
        let mut report = StopReport::default();

        for (address, mut handle) in set.tasks {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => report.stopped += 1,
                Ok(Err(e)) => {
                    error!("Polling task for {} ended abnormally: {}", address, e);
                    report.stopped += 1;
                }
                Err(_) => {
                    warn!(
                        "Polling task for {} did not stop within {:?}, detaching it",
                        address, self.config.stop_timeout
                    );
                    report.detached += 1;
                }
            }
        }

        self.seal_all();
        info!(
            "Latency monitoring stopped (stopped={}, detached={})",
            report.stopped, report.detached
        );
        report
    }

    fn seal_all(&self) {
        let hosts = self.hosts.read().unwrap_or_else(|p| p.into_inner());
        for slot in hosts.values() {
            let mut slot = slot.lock().unwrap_or_else(|p| p.into_inner());
            slot.sealed = true;
        }
    }

    /// Point-in-time copy of every host record
    pub fn snapshot(&self) -> HashMap<String, HostRecord> {
        let hosts = self.hosts.read().unwrap_or_else(|p| p.into_inner());
        hosts
            .iter()
            .map(|(address, slot)| {
                let slot = slot.lock().unwrap_or_else(|p| p.into_inner());
                (address.clone(), slot.record.clone())
            })
            .collect()
    }

    /// Copy of a single host's record
    pub fn host(&self, address: &str) -> Option<HostRecord> {
        let hosts = self.hosts.read().unwrap_or_else(|p| p.into_inner());
        hosts.get(address).map(|slot| {
            let slot = slot.lock().unwrap_or_else(|p| p.into_inner());
            slot.record.clone()
        })
    }

    /// Whether a polling session is currently registered
    pub async fn is_running(&self) -> bool {
        self.pollers.lock().await.is_some()
    }

    /// Number of registered polling tasks that have not exited
    ///
    /// A host whose task faulted stops receiving samples and drops out of this count.
    pub async fn active_pollers(&self) -> usize {
        let pollers = self.pollers.lock().await;
        pollers
            .as_ref()
            .map(|set| set.tasks.iter().filter(|(_, h)| !h.is_finished()).count())
            .unwrap_or(0)
    }
}

/// Body of one host's polling task
async fn poll_host(
    address: String,
    slot: SharedSlot,
    probe: Arc<dyn ProbeSender>,
    config: LatencyMonitorConfig,
    mut stop: StopSignal,
) {
    debug!("Polling task started for {}", address);
    let mut probes: u64 = 0;

    loop {
        // Also the post-wake check after the sleep below
        if stop.is_stopped() {
            break;
        }

        let sample = probe_once(probe.as_ref(), &address, config.probe_timeout).await;
        probes += 1;
        trace!(
            "Probe #{} to {}: {:?} ({})",
            probes, address, sample.elapsed_ms, sample.tier
        );

        if !append(&slot, sample) {
            debug!("Record for {} is sealed, ending polling task", address);
            break;
        }

        if stop.is_stopped() {
            break;
        }
        if stop.sleep(config.poll_interval).await {
            break;
        }
    }

    debug!("Polling task for {} exited after {} probes", address, probes);
}

/// Runs one probe and turns any failure into a lost sample
async fn probe_once(probe: &dyn ProbeSender, address: &str, timeout: Duration) -> LatencySample {
    match tokio::time::timeout(timeout + PROBE_GRACE, probe.send(address, timeout)).await {
        Ok(Ok(ProbeReply::Measured(ms))) => LatencySample::measured(Utc::now(), ms),
        Ok(Ok(ProbeReply::Unmeasured)) => LatencySample::unmeasured(Utc::now()),
        Ok(Err(e)) => {
            debug!("Probe to {} failed: {}", address, e);
            LatencySample::lost(Utc::now())
        }
        Err(_) => {
            debug!("Probe to {} exceeded {:?}", address, timeout + PROBE_GRACE);
            LatencySample::lost(Utc::now())
        }
    }
}

/// Appends under the slot lock; returns false once the slot is sealed
fn append(slot: &SharedSlot, sample: LatencySample) -> bool {
    let mut slot = match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            error!("Host record lock poisoned, recovering");
            poisoned.into_inner()
        }
    };
    if slot.sealed {
        return false;
    }
    slot.record.record(sample);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::errors::ProbeError;
    use crate::models::QualityTier;
    use async_trait::async_trait;

    /// Replies with a fixed outcome per address
    struct ScriptedProbe {
        replies: HashMap<String, Result<ProbeReply, ()>>,
    }

    #[async_trait]
    impl ProbeSender for ScriptedProbe {
        async fn send(&self, address: &str, _timeout: Duration) -> Result<ProbeReply, ProbeError> {
            match self.replies.get(address) {
                Some(Ok(reply)) => Ok(*reply),
                _ => Err(ProbeError::Unreachable(address.to_string())),
            }
        }
    }

    /// Never answers, to exercise the probe timeout
    struct HangingProbe;

    #[async_trait]
    impl ProbeSender for HangingProbe {
        async fn send(&self, _address: &str, _timeout: Duration) -> Result<ProbeReply, ProbeError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ProbeReply::Measured(1.0))
        }
    }

    fn fast_config() -> LatencyMonitorConfig {
        LatencyMonitorConfig {
            poll_interval: Duration::from_millis(20),
            probe_timeout: Duration::from_millis(50),
            history_capacity: 5,
            stop_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn test_probe_outcomes_become_samples() {
        let probe = ScriptedProbe {
            replies: HashMap::from([
                ("10.0.0.1".to_string(), Ok(ProbeReply::Measured(4.0))),
                ("10.0.0.2".to_string(), Ok(ProbeReply::Unmeasured)),
                ("10.0.0.3".to_string(), Err(())),
            ]),
        };
        let monitor = LatencyMonitor::new(Arc::new(probe), fast_config());
        let devices = vec![
            Device::new("10.0.0.1"),
            Device::new("10.0.0.2"),
            Device::new("10.0.0.3"),
        ];

        assert_eq!(monitor.start(&devices).await, 3);
        tokio::time::sleep(Duration::from_millis(150)).await;
        monitor.stop().await;

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot["10.0.0.1"].current_tier, QualityTier::Excellent);
        assert_eq!(snapshot["10.0.0.2"].current_tier, QualityTier::Slow);
        assert_eq!(snapshot["10.0.0.3"].current_tier, QualityTier::Down);

        let down = snapshot["10.0.0.3"].latest().unwrap();
        assert!(down.lost);
        assert_eq!(down.elapsed_ms, None);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let probe = ScriptedProbe {
            replies: HashMap::from([("10.0.0.1".to_string(), Ok(ProbeReply::Measured(20.0)))]),
        };
        let monitor = LatencyMonitor::new(Arc::new(probe), fast_config());
        monitor.start(&[Device::new("10.0.0.1")]).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        monitor.stop().await;

        let record = monitor.host("10.0.0.1").unwrap();
        assert_eq!(record.sample_count(), 5);
        assert_eq!(record.current_tier, QualityTier::Good);
    }

    #[tokio::test]
    async fn test_skips_blank_and_duplicate_addresses() {
        let probe = ScriptedProbe {
            replies: HashMap::new(),
        };
        let monitor = LatencyMonitor::new(Arc::new(probe), fast_config());
        let devices = vec![
            Device::new("10.0.0.1"),
            Device::new(""),
            Device::new("10.0.0.1"),
        ];

        assert_eq!(monitor.start(&devices).await, 1);
        assert_eq!(monitor.snapshot().len(), 1);
        monitor.stop().await;
    }

    #[tokio::test]
    async fn test_hanging_probe_is_recorded_as_lost() {
        let monitor = LatencyMonitor::new(Arc::new(HangingProbe), fast_config());
        monitor.start(&[Device::new("10.0.0.9")]).await;
        tokio::time::sleep(Duration::from_millis(800)).await;
        let report = monitor.stop().await;

        assert!(report.is_clean());
        let record = monitor.host("10.0.0.9").unwrap();
        assert!(record.sample_count() >= 1);
        assert!(record.history.iter().all(|s| s.lost));
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let monitor = LatencyMonitor::new(
            Arc::new(ScriptedProbe {
                replies: HashMap::new(),
            }),
            fast_config(),
        );
        assert_eq!(monitor.stop().await, StopReport::default());
        assert!(!monitor.is_running().await);
    }
}
