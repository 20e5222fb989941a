pub mod collaborator;
pub mod discovery;
pub mod errors;
pub mod latency_monitor;
pub mod platform;
pub mod probe;
pub mod shutdown;
pub mod speed_sampler;
pub mod throughput;

pub use collaborator::Collaborator;
pub use discovery::NetworkScanner;
pub use latency_monitor::{LatencyMonitor, LatencyMonitorConfig};
pub use shutdown::StopReport;
pub use probe::{PingProbe, ProbeReply, ProbeSender};
pub use speed_sampler::{SpeedSampler, SpeedSamplerConfig};
pub use throughput::{SpeedtestCli, ThroughputMeter, ThroughputReading};
