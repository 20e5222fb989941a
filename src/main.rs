mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{commands::Commands, Cli, MonitorCommandHandler};
use netpulse::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let handler = MonitorCommandHandler::new(settings);

    match cli.command {
        Commands::Subnet => handler.handle_subnet_command()?,
        Commands::Scan { range, json } => handler.handle_scan_command(range, json)?,
        Commands::Speed { json } => handler.handle_speed_command(json).await?,
        Commands::Monitor {
            range,
            duration,
            speed_interval,
            refresh,
        } => {
            handler
                .handle_monitor_command(range, duration, speed_interval, refresh)
                .await?
        }
        Commands::Live {
            range,
            speed_interval,
            refresh_ms,
        } => {
            handler
                .handle_live_command(range, speed_interval, refresh_ms)
                .await?
        }
    }

    Ok(())
}
