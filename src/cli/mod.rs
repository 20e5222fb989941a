pub mod commands;
pub mod dashboard;
pub mod formatting;
pub mod monitor_commands;

pub use commands::Cli;
pub use monitor_commands::MonitorCommandHandler;
