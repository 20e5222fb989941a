//! Fake collaborators shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use netpulse::collectors::errors::{MeasureError, ProbeError};
use netpulse::collectors::probe::{ProbeReply, ProbeSender};
use netpulse::collectors::throughput::{ThroughputMeter, ThroughputReading};
use netpulse::models::Device;

/// Answers every probe after `delay` with `elapsed_ms`, counting calls per address
pub struct CountingProbe {
    counts: Mutex<HashMap<String, usize>>,
    elapsed_ms: f64,
    delay: Duration,
}

impl CountingProbe {
    pub fn new(elapsed_ms: f64) -> Self {
        Self::with_delay(elapsed_ms, Duration::ZERO)
    }

    pub fn with_delay(elapsed_ms: f64, delay: Duration) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            elapsed_ms,
            delay,
        }
    }

    pub fn count(&self, address: &str) -> usize {
        self.counts.lock().unwrap().get(address).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ProbeSender for CountingProbe {
    async fn send(&self, address: &str, _timeout: Duration) -> Result<ProbeReply, ProbeError> {
        *self
            .counts
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_insert(0) += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(ProbeReply::Measured(self.elapsed_ms))
    }
}

/// Alternates success and failure on every call
pub struct FlappingProbe {
    calls: AtomicUsize,
}

impl FlappingProbe {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProbeSender for FlappingProbe {
    async fn send(&self, address: &str, _timeout: Duration) -> Result<ProbeReply, ProbeError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
            Ok(ProbeReply::Measured(30.0))
        } else {
            Err(ProbeError::Unreachable(address.to_string()))
        }
    }
}

/// Panics on the first probe
pub struct PanickingProbe;

#[async_trait]
impl ProbeSender for PanickingProbe {
    async fn send(&self, _address: &str, _timeout: Duration) -> Result<ProbeReply, ProbeError> {
        panic!("probe transport exploded");
    }
}

/// Returns the same reading every time, counting calls
pub struct FixedMeter {
    pub reading: ThroughputReading,
    pub calls: AtomicUsize,
}

impl FixedMeter {
    pub fn new(download_bps: f64, upload_bps: f64, ping_ms: f64) -> Self {
        Self {
            reading: ThroughputReading {
                download_bps,
                upload_bps,
                ping_ms,
                server_name: "Test ISP (Testville)".to_string(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ThroughputMeter for FixedMeter {
    async fn measure(&self) -> Result<ThroughputReading, MeasureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reading.clone())
    }
}

/// Always fails like a tool that exited non-zero
pub struct FailingMeter;

#[async_trait]
impl ThroughputMeter for FailingMeter {
    async fn measure(&self) -> Result<ThroughputReading, MeasureError> {
        Err(MeasureError::ToolFailed {
            status: "exit status: 1".to_string(),
            stderr: "Cannot retrieve speedtest configuration".to_string(),
        })
    }
}

/// Never finishes on its own
pub struct HangingMeter;

#[async_trait]
impl ThroughputMeter for HangingMeter {
    async fn measure(&self) -> Result<ThroughputReading, MeasureError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(MeasureError::Timeout(Duration::from_secs(3600)))
    }
}

pub fn devices(addresses: &[&str]) -> Vec<Device> {
    addresses
        .iter()
        .map(|address| Device::new(*address).with_name(format!("host-{address}")))
        .collect()
}
