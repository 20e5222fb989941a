use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for the netpulse application
/// Uses clap's derive macros for automatic CLI generation
#[derive(Parser)]
#[command(author = "Kaipo Chen")]
#[command(version)] // Automatically uses version from Cargo.toml
#[command(about = "Network Pulse - Monitor local device latency and internet speed")]
#[command(long_about = "Network Pulse discovers devices on the local subnet, pings each of them \
continuously on its own background task, classifies responsiveness into quality tiers \
(excellent/good/fair/slow/down) and periodically samples internet download/upload speed. \
When nmap or speedtest-cli are missing, demo devices and simulated speed samples are used \
and clearly marked as such.")]
pub struct Cli {
    /// Configuration file (defaults to ./netpulse.toml when present)
    #[arg(short, long, global = true, help = "Path to a TOML configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands for the netpulse application
#[derive(Subcommand)]
pub enum Commands {
    /// Print the detected local subnet
    #[command(about = "Show the detected local subnet")]
    Subnet,

    /// One-off device discovery
    #[command(about = "Scan the local network for devices")]
    #[command(long_about = "Scans the local subnet (or the given range) with nmap and lists \
the devices found. Without nmap a demo device set is listed and flagged.\n\n\
Examples:\n  \
np scan                               # Scan the detected subnet\n  \
np scan --range 10.0.0.0/24           # Scan a specific range\n  \
np scan --json                        # Machine-readable output")]
    Scan {
        /// Range to scan instead of the detected subnet
        #[arg(short, long, help = "CIDR range to scan, e.g. 192.168.1.0/24")]
        range: Option<String>,

        #[arg(long, help = "Print the scan report as JSON")]
        json: bool,
    },

    /// One-off internet speed measurement
    #[command(about = "Measure internet speed once")]
    Speed {
        #[arg(long, help = "Print the sample as JSON")]
        json: bool,
    },

    /// Run a monitoring session and print periodic status tables
    #[command(about = "Monitor devices and internet speed, printing status tables")]
    #[command(long_about = "Scans the network, starts one latency poller per device plus the \
periodic speed sampler, and prints a status table on every refresh until the duration \
elapses or Ctrl-C is pressed.\n\n\
Examples:\n  \
np monitor                            # Monitor until Ctrl-C\n  \
np monitor --duration 60              # Monitor for one minute\n  \
np monitor --speed-interval 300       # Sample internet speed every 5 minutes")]
    Monitor {
        #[arg(short, long, help = "CIDR range to scan, e.g. 192.168.1.0/24")]
        range: Option<String>,

        /// Stop after this many seconds (runs until Ctrl-C when omitted)
        #[arg(short, long, help = "Monitoring duration in seconds")]
        duration: Option<u64>,

        #[arg(short, long, help = "Seconds between speed samples (default from config)")]
        speed_interval: Option<u64>,

        #[arg(
            long,
            default_value = "5",
            help = "Seconds between status table refreshes"
        )]
        refresh: u64,
    },

    /// Interactive terminal dashboard
    #[command(about = "Monitor in an interactive terminal dashboard")]
    #[command(long_about = "Launches an interactive dashboard with every monitored device \
coloured by quality tier, its latest round-trip time, loss rate and estimated link speed, \
plus the latest internet speed sample. Press 't' to run a speed test now, \
'q' or ESC to exit.")]
    Live {
        #[arg(short, long, help = "CIDR range to scan, e.g. 192.168.1.0/24")]
        range: Option<String>,

        #[arg(short, long, help = "Seconds between speed samples (default from config)")]
        speed_interval: Option<u64>,

        #[arg(
            long,
            default_value = "500",
            help = "Dashboard redraw interval in milliseconds"
        )]
        refresh_ms: u64,
    },
}
