//! Periodic internet throughput sampling
//!
//! One background task measures on a fixed interval; [`SpeedSampler::run_once`]
//! measures on demand. Every measurement ends up as a [`SpeedSample`]: a real
//! one when the throughput tool answered, otherwise a simulated one drawn from
//! fixed plausible ranges and flagged `is_simulated`. Measuring never fails.

use chrono::Utc;
use log::{debug, info, warn};
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::collectors::collaborator::Collaborator;
use crate::collectors::errors::MeasureError;
use crate::collectors::shutdown::{StopController, StopReport, StopSignal};
use crate::collectors::throughput::{ThroughputMeter, ThroughputReading};
use crate::models::SpeedSample;
use crate::storage::RingBuffer;

/// Download range for simulated samples, in Mbps
pub const SIMULATED_DOWNLOAD_MBPS: RangeInclusive<f64> = 50.0..=200.0;
/// Upload range for simulated samples, in Mbps
pub const SIMULATED_UPLOAD_MBPS: RangeInclusive<f64> = 10.0..=50.0;
/// Ping range for simulated samples, in milliseconds
pub const SIMULATED_PING_MS: RangeInclusive<f64> = 10.0..=50.0;

const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Tuning for the speed sampler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSamplerConfig {
    /// Samples retained in history
    pub history_capacity: usize,
    /// Longest a single real measurement may take before falling back
    pub measure_timeout: Duration,
    /// Upper bound on how long `stop` waits for the task to exit
    pub stop_timeout: Duration,
}

impl Default for SpeedSamplerConfig {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            measure_timeout: Duration::from_secs(120),
            stop_timeout: Duration::from_secs(3),
        }
    }
}

struct SamplerTask {
    controller: StopController,
    /// Cleared when the task is stopped; a detached task checks it before recording
    open: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

struct SamplerCore {
    meter: Collaborator<Arc<dyn ThroughputMeter>>,
    history: RwLock<RingBuffer<SpeedSample>>,
    config: SpeedSamplerConfig,
}

/// Owns the periodic throughput sampling task and its history
pub struct SpeedSampler {
    core: Arc<SamplerCore>,
    task: AsyncMutex<Option<SamplerTask>>,
}

impl SpeedSampler {
    pub fn new(meter: Collaborator<Arc<dyn ThroughputMeter>>, config: SpeedSamplerConfig) -> Self {
        if let Collaborator::Unavailable(reason) = &meter {
            warn!("No throughput tool ({}), speed samples will be simulated", reason);
        }
        Self {
            core: Arc::new(SamplerCore {
                meter,
                history: RwLock::new(RingBuffer::with_capacity(config.history_capacity)),
                config,
            }),
            task: AsyncMutex::new(None),
        }
    }

    /// Whether real measurements are possible
    pub fn has_real_meter(&self) -> bool {
        self.core.meter.is_available()
    }

    /// Stops any running sampling task and starts a new one
    ///
    /// The first sample is taken immediately, then every `interval_seconds`.
    pub async fn start(&self, interval_seconds: u64) {
        let mut task = self.task.lock().await;
        self.stop_locked(&mut task).await;

        let interval = if interval_seconds == 0 {
            warn!("Speed sampling interval of 0s requested, using 1s");
            Duration::from_secs(1)
        } else {
            Duration::from_secs(interval_seconds)
        };

        let controller = StopController::new();
        let open = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(sample_periodically(
            Arc::clone(&self.core),
            interval,
            controller.subscribe(),
            Arc::clone(&open),
        ));

        info!("Speed sampling started (interval={:?})", interval);
        *task = Some(SamplerTask {
            controller,
            open,
            handle,
        });
    }

    /// Stops the sampling task at its next wait
    ///
    /// The wait between samples is cancellable, so this returns promptly unless
    /// a measurement is in flight; that one gets up to `stop_timeout`.
    pub async fn stop(&self) -> StopReport {
        let mut task = self.task.lock().await;
        self.stop_locked(&mut task).await
    }

    async fn stop_locked(&self, task: &mut Option<SamplerTask>) -> StopReport {
        let Some(SamplerTask {
            controller,
            open,
            mut handle,
        }) = task.take()
        else {
            return StopReport::default();
        };

        controller.stop();
        let report = match tokio::time::timeout(self.core.config.stop_timeout, &mut handle).await
        {
            Ok(Ok(())) => StopReport {
                stopped: 1,
                detached: 0,
            },
            Ok(Err(e)) => {
                warn!("Speed sampling task ended abnormally: {}", e);
                StopReport {
                    stopped: 1,
                    detached: 0,
                }
            }
            Err(_) => {
                warn!(
                    "Speed sampling task did not stop within {:?}, detaching it",
                    self.core.config.stop_timeout
                );
                StopReport {
                    stopped: 0,
                    detached: 1,
                }
            }
        };
        open.store(false, Ordering::SeqCst);
        info!("Speed sampling stopped");
        report
    }

    /// Takes one measurement now and appends it to history
    pub async fn run_once(&self) -> SpeedSample {
        let sample = self.core.measure().await;
        self.core.record(sample.clone());
        sample
    }

    /// Copy of the history, oldest first
    pub fn snapshot(&self) -> Vec<SpeedSample> {
        let history = self.core.history.read().unwrap_or_else(|p| p.into_inner());
        history.to_vec()
    }

    /// Most recent sample, if any
    pub fn latest(&self) -> Option<SpeedSample> {
        let history = self.core.history.read().unwrap_or_else(|p| p.into_inner());
        history.latest().cloned()
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }
}

impl SamplerCore {
    async fn measure(&self) -> SpeedSample {
        let meter = match &self.meter {
            Collaborator::Available(meter) => meter,
            Collaborator::Unavailable(reason) => {
                debug!("Simulating speed sample: {}", reason);
                return simulated_sample();
            }
        };

        match tokio::time::timeout(self.config.measure_timeout, meter.measure()).await {
            Ok(Ok(reading)) => match real_sample(&reading) {
                Some(sample) => {
                    debug!(
                        "Measured {:.2}/{:.2} Mbps, {:.2} ms via {}",
                        sample.download_mbps,
                        sample.upload_mbps,
                        sample.ping_ms,
                        sample.server_label
                    );
                    sample
                }
                None => {
                    warn!("Throughput tool reported non-finite values {:?}, simulating", reading);
                    simulated_sample()
                }
            },
            Ok(Err(e)) => {
                warn!("Throughput measurement failed, simulating: {}", e);
                simulated_sample()
            }
            Err(_) => {
                let e = MeasureError::Timeout(self.config.measure_timeout);
                warn!("{}, simulating", e);
                simulated_sample()
            }
        }
    }

    fn record(&self, sample: SpeedSample) {
        let mut history = self.history.write().unwrap_or_else(|p| p.into_inner());
        history.push(sample);
    }
}

async fn sample_periodically(
    core: Arc<SamplerCore>,
    interval: Duration,
    mut stop: StopSignal,
    open: Arc<AtomicBool>,
) {
    loop {
        if stop.is_stopped() {
            break;
        }

        let sample = core.measure().await;
        if !open.load(Ordering::SeqCst) {
            debug!("Sampler was stopped during a measurement, dropping sample");
            break;
        }
        core.record(sample);

        if stop.is_stopped() {
            break;
        }
        if stop.sleep(interval).await {
            break;
        }
    }
    debug!("Speed sampling task exited");
}

/// Rounds to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Converts a raw reading into a sample, or `None` if any value is unusable
pub fn real_sample(reading: &ThroughputReading) -> Option<SpeedSample> {
    let finite = [reading.download_bps, reading.upload_bps, reading.ping_ms]
        .iter()
        .all(|v| v.is_finite());
    if !finite {
        return None;
    }

    Some(SpeedSample {
        timestamp: Utc::now(),
        download_mbps: round2(reading.download_bps / BITS_PER_MEGABIT),
        upload_mbps: round2(reading.upload_bps / BITS_PER_MEGABIT),
        ping_ms: round2(reading.ping_ms),
        server_label: reading.server_name.clone(),
        is_simulated: false,
    })
}

/// Draws a flagged sample from the simulation ranges
pub fn simulated_sample() -> SpeedSample {
    let mut rng = rand::thread_rng();
    SpeedSample::simulated(
        Utc::now(),
        round2(rng.gen_range(SIMULATED_DOWNLOAD_MBPS)),
        round2(rng.gen_range(SIMULATED_UPLOAD_MBPS)),
        round2(rng.gen_range(SIMULATED_PING_MS)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(93.871451), 93.87);
        assert_eq!(round2(9.286), 9.29);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_real_sample_conversion() {
        let reading = ThroughputReading {
            download_bps: 93_871_451.0,
            upload_bps: 9_283_471.0,
            ping_ms: 14.208,
            server_name: "Example (City)".to_string(),
        };

        let sample = real_sample(&reading).unwrap();
        assert_eq!(sample.download_mbps, 93.87);
        assert_eq!(sample.upload_mbps, 9.28);
        assert_eq!(sample.ping_ms, 14.21);
        assert_eq!(sample.server_label, "Example (City)");
        assert!(!sample.is_simulated);
    }

    #[test]
    fn test_non_finite_reading_is_rejected() {
        let reading = ThroughputReading {
            download_bps: f64::NAN,
            upload_bps: 1.0,
            ping_ms: 1.0,
            server_name: String::new(),
        };
        assert!(real_sample(&reading).is_none());
    }

    #[test]
    fn test_simulated_sample_within_ranges() {
        for _ in 0..500 {
            let sample = simulated_sample();
            assert!(sample.is_simulated);
            assert_eq!(sample.server_label, "simulated");
            assert!(SIMULATED_DOWNLOAD_MBPS.contains(&sample.download_mbps));
            assert!(SIMULATED_UPLOAD_MBPS.contains(&sample.upload_mbps));
            assert!(SIMULATED_PING_MS.contains(&sample.ping_ms));
        }
    }

    #[tokio::test]
    async fn test_run_once_without_meter_appends_simulated() {
        let sampler = SpeedSampler::new(
            Collaborator::Unavailable("not installed".to_string()),
            SpeedSamplerConfig::default(),
        );
        assert!(!sampler.has_real_meter());

        let sample = sampler.run_once().await;
        assert!(sample.is_simulated);
        assert_eq!(sampler.snapshot(), vec![sample]);
    }

    #[tokio::test]
    async fn test_history_is_capped() {
        let config = SpeedSamplerConfig {
            history_capacity: 3,
            ..SpeedSamplerConfig::default()
        };
        let sampler = SpeedSampler::new(Collaborator::Unavailable("none".to_string()), config);
        for _ in 0..5 {
            sampler.run_once().await;
        }
        assert_eq!(sampler.snapshot().len(), 3);
    }
}
