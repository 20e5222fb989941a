pub mod device;
pub mod latency;
pub mod speed;

pub use device::{Device, ScanReport};
pub use latency::{
    classify, HostRecord, LatencySample, QualityTier, UNMEASURED_ELAPSED_MS,
};
pub use speed::{SpeedSample, SIMULATED_SERVER_LABEL};
