//! Latency samples, quality tiers and per-host history
//!
//! Classification is a pure function of the elapsed round-trip time. A host's
//! `current_tier` is always the tier of its newest sample, so consumers never
//! need to scan the history to know the present state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::storage::RingBuffer;

/// Elapsed time recorded for a successful probe whose reply carried no parseable time.
/// Sits above the `Slow` threshold so the stored value and the tier agree.
pub const UNMEASURED_ELAPSED_MS: f64 = 1000.0;

/// Coarse responsiveness classification of a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    /// Under 10 ms
    Excellent,
    /// 10 to 50 ms
    Good,
    /// 50 to 100 ms
    Fair,
    /// 100 ms and above, or a reply without a measurable time
    Slow,
    /// Probe failed or timed out
    Down,
    /// No sample yet
    Unknown,
}

impl QualityTier {
    /// Lowercase label used in tables and logs
    pub fn label(&self) -> &'static str {
        match self {
            QualityTier::Excellent => "excellent",
            QualityTier::Good => "good",
            QualityTier::Fair => "fair",
            QualityTier::Slow => "slow",
            QualityTier::Down => "down",
            QualityTier::Unknown => "unknown",
        }
    }

    /// Rough link speed a tier usually corresponds to on a LAN
    pub fn estimated_link_speed(&self) -> &'static str {
        match self {
            QualityTier::Excellent => "1000 Mbps",
            QualityTier::Good => "100 Mbps",
            QualityTier::Fair => "10 Mbps",
            QualityTier::Slow => "<10 Mbps",
            QualityTier::Down => "DOWN",
            QualityTier::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maps a successful probe's round-trip time to a tier
///
/// Only meaningful for successful probes; failures are always [`QualityTier::Down`].
pub fn classify(elapsed_ms: f64) -> QualityTier {
    if elapsed_ms < 10.0 {
        QualityTier::Excellent
    } else if elapsed_ms < 50.0 {
        QualityTier::Good
    } else if elapsed_ms < 100.0 {
        QualityTier::Fair
    } else {
        // Also catches NaN, which compares false above
        QualityTier::Slow
    }
}

/// One probe result
///
/// `elapsed_ms` is `None` exactly when `lost` is true. Use the constructors to
/// keep that pairing intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    pub timestamp: DateTime<Utc>,
    pub elapsed_ms: Option<f64>,
    pub tier: QualityTier,
    pub lost: bool,
}

impl LatencySample {
    /// Successful probe with a measured round-trip time
    pub fn measured(timestamp: DateTime<Utc>, elapsed_ms: f64) -> Self {
        Self {
            timestamp,
            elapsed_ms: Some(elapsed_ms),
            tier: classify(elapsed_ms),
            lost: false,
        }
    }

    /// Successful probe whose reply could not be timed
    pub fn unmeasured(timestamp: DateTime<Utc>) -> Self {
        Self::measured(timestamp, UNMEASURED_ELAPSED_MS)
    }

    /// Failed or timed-out probe
    pub fn lost(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            elapsed_ms: None,
            tier: QualityTier::Down,
            lost: true,
        }
    }
}

/// Latency history of one monitored host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostRecord {
    pub address: String,
    pub display_name: String,
    pub history: RingBuffer<LatencySample>,
    pub current_tier: QualityTier,
}

impl HostRecord {
    pub fn new(
        address: impl Into<String>,
        display_name: impl Into<String>,
        capacity: usize,
    ) -> Self {
        Self {
            address: address.into(),
            display_name: display_name.into(),
            history: RingBuffer::with_capacity(capacity),
            current_tier: QualityTier::Unknown,
        }
    }

    /// Appends a sample, evicting the oldest at capacity, and refreshes `current_tier`
    pub fn record(&mut self, sample: LatencySample) {
        self.current_tier = sample.tier;
        self.history.push(sample);
    }

    pub fn latest(&self) -> Option<&LatencySample> {
        self.history.latest()
    }

    pub fn sample_count(&self) -> usize {
        self.history.len()
    }

    /// Fraction of retained samples that were lost, 0.0 for an empty history
    pub fn loss_rate(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        let lost = self.history.iter().filter(|s| s.lost).count();
        lost as f64 / self.history.len() as f64
    }

    /// Mean round-trip time over retained successful samples
    pub fn average_ms(&self) -> Option<f64> {
        let measured: Vec<f64> = self.history.iter().filter_map(|s| s.elapsed_ms).collect();
        if measured.is_empty() {
            None
        } else {
            Some(measured.iter().sum::<f64>() / measured.len() as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(0.0), QualityTier::Excellent);
        assert_eq!(classify(9.999), QualityTier::Excellent);
        assert_eq!(classify(10.0), QualityTier::Good);
        assert_eq!(classify(49.99), QualityTier::Good);
        assert_eq!(classify(50.0), QualityTier::Fair);
        assert_eq!(classify(99.9), QualityTier::Fair);
        assert_eq!(classify(100.0), QualityTier::Slow);
        assert_eq!(classify(2500.0), QualityTier::Slow);
    }

    #[test]
    fn test_classify_is_deterministic() {
        for ms in [0.5, 12.0, 75.0, 180.0] {
            assert_eq!(classify(ms), classify(ms));
        }
    }

    #[test]
    fn test_unmeasured_sample_is_slow_not_lost() {
        let sample = LatencySample::unmeasured(Utc::now());
        assert_eq!(sample.tier, QualityTier::Slow);
        assert!(!sample.lost);
        assert_eq!(sample.elapsed_ms, Some(UNMEASURED_ELAPSED_MS));
        assert_eq!(classify(UNMEASURED_ELAPSED_MS), QualityTier::Slow);
    }

    #[test]
    fn test_lost_sample_has_no_elapsed_time() {
        let sample = LatencySample::lost(Utc::now());
        assert!(sample.lost);
        assert_eq!(sample.elapsed_ms, None);
        assert_eq!(sample.tier, QualityTier::Down);
    }

    #[test]
    fn test_empty_record_is_unknown() {
        let record = HostRecord::new("192.168.1.1", "router", 10);
        assert_eq!(record.current_tier, QualityTier::Unknown);
        assert!(record.latest().is_none());
        assert_eq!(record.loss_rate(), 0.0);
        assert_eq!(record.average_ms(), None);
    }

    #[test]
    fn test_current_tier_tracks_latest_sample() {
        let mut record = HostRecord::new("192.168.1.1", "router", 10);
        let now = Utc::now();

        record.record(LatencySample::measured(now, 4.0));
        assert_eq!(record.current_tier, QualityTier::Excellent);

        record.record(LatencySample::lost(now + Duration::seconds(2)));
        assert_eq!(record.current_tier, QualityTier::Down);

        record.record(LatencySample::measured(now + Duration::seconds(4), 60.0));
        assert_eq!(record.current_tier, QualityTier::Fair);
        assert_eq!(record.current_tier, record.latest().unwrap().tier);
    }

    #[test]
    fn test_history_evicts_oldest_in_time_order() {
        let capacity = 5;
        let mut record = HostRecord::new("10.0.0.2", "host", capacity);
        let start = Utc::now();
        for i in 0..12 {
            record.record(LatencySample::measured(start + Duration::seconds(i), 5.0));
        }

        assert_eq!(record.sample_count(), capacity);
        let timestamps: Vec<_> = record.history.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps[0], start + Duration::seconds(7));
        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_loss_rate_and_average() {
        let mut record = HostRecord::new("10.0.0.2", "host", 10);
        let now = Utc::now();
        record.record(LatencySample::measured(now, 10.0));
        record.record(LatencySample::measured(now, 30.0));
        record.record(LatencySample::lost(now));
        record.record(LatencySample::lost(now));

        assert_eq!(record.loss_rate(), 0.5);
        assert_eq!(record.average_ms(), Some(20.0));
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(QualityTier::Good.to_string(), "good");
        assert_eq!(QualityTier::Excellent.estimated_link_speed(), "1000 Mbps");
        assert_eq!(QualityTier::Down.estimated_link_speed(), "DOWN");
    }
}
