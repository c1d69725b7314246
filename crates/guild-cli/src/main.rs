//! Diploma Guild CLI.
//!
//! Replays governance scenarios against an in-process guild and predicts
//! proposal ids for clients.

mod commands;
mod config;
mod output;
mod scenario;
mod telemetry;

use clap::Parser;

fn main() {
    let cli = commands::Cli::parse();

    if let Err(e) = run(cli) {
        output::print_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: commands::Cli) -> anyhow::Result<()> {
    let mut config = commands::load_config(cli.config.as_ref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json_logs {
        config.logging.format = "json".to_string();
    }

    telemetry::init_telemetry(&config.logging.level, config.logging.json())?;
    tracing::debug!(?config, "configuration loaded");

    commands::execute(cli.command, &config)
}
