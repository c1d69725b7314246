//! CLI command implementations.

use clap::{Parser, Subcommand};
use colored::Colorize;
use guild_contracts::{GuildAddresses, ProjectActions};
use guild_governance::hash_description;
use serde::Serialize;
use std::path::PathBuf;

use crate::config::GuildConfig;
use crate::output::*;
use crate::scenario::{resolve_account, Scenario, ScenarioRunner};

/// Main CLI.
#[derive(Parser)]
#[command(name = "diploma-guild")]
#[command(about = "Diploma Guild - peer-reviewed projects, timelocked diplomas")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, env = "DIPLOMA_GUILD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level or filter directive (overrides the config file)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Deploy a fresh guild and replay a scenario file against it
    Run {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Mine one block per write step, whatever the scenario says
        #[arg(long)]
        automine: bool,

        /// Print the step report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Predict the proposal id for a diploma request
    PredictId {
        /// Diploma recipient (label or address)
        #[arg(long)]
        recipient: String,

        /// Diploma metadata URI
        #[arg(long)]
        uri: String,

        /// Proposal description (the project URL)
        #[arg(long)]
        description: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the configuration in effect as TOML
    Config {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Load the config file if one was given.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GuildConfig> {
    match path {
        Some(path) => GuildConfig::from_file(path),
        None => Ok(GuildConfig::default()),
    }
}

/// Execute a command.
pub fn execute(cmd: Commands, config: &GuildConfig) -> anyhow::Result<()> {
    match cmd {
        Commands::Run { scenario, automine, json } => run_scenario(scenario, automine, json, config),
        Commands::PredictId { recipient, uri, description, json } => {
            predict_id(&recipient, &uri, &description, json, config)
        }
        Commands::Config { output } => show_config(output, config),
    }
}

fn run_scenario(path: PathBuf, automine: bool, json: bool, config: &GuildConfig) -> anyhow::Result<()> {
    let scenario = Scenario::from_file(&path)?;
    let mut runner = ScenarioRunner::new(&scenario, config, automine)?;

    if !json {
        let title = if scenario.name.is_empty() {
            path.display().to_string()
        } else {
            scenario.name.clone()
        };
        print_info(&format!("Running scenario {} ({} steps)", title.bold(), scenario.steps.len()));
    }

    let reports = runner.run(&scenario.steps)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        println!(
            "  {:>3}. {:<16} {} {}",
            report.index,
            report.action.cyan(),
            format!("[block {}]", report.block).dimmed(),
            report.detail
        );
    }

    let states = runner.project_states()?;
    if !states.is_empty() {
        println!("{}", "Projects".bold());
        for (project, state) in states {
            print_field(&project, &format_state(state));
        }
    }
    print_success(&format!("All {} steps passed", reports.len()));
    Ok(())
}

#[derive(Serialize)]
struct PredictedProposal {
    proposal_id: String,
    description_hash: String,
    target: String,
    calldata: String,
}

fn predict_id(
    recipient: &str,
    uri: &str,
    description: &str,
    json: bool,
    config: &GuildConfig,
) -> anyhow::Result<()> {
    let deployer = resolve_account(&config.deployer)?;
    let recipient = resolve_account(recipient)?;
    let addresses = GuildAddresses::derive(deployer);

    let actions = ProjectActions::mint_diploma(addresses.diploma, recipient, uri)?;
    let proposal_id = actions.proposal_id(description)?;
    let description_hash = hash_description(description);

    let predicted = PredictedProposal {
        proposal_id: format_hash(&proposal_id),
        description_hash: format_hash(&description_hash),
        target: addresses.diploma.to_string(),
        calldata: format!("0x{}", hex::encode(&actions.calldatas[0])),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&predicted)?);
        return Ok(());
    }

    println!("{}", "Diploma proposal".bold());
    print_field("Proposal ID", &predicted.proposal_id);
    print_field("Description hash", &predicted.description_hash);
    print_field("Target", &predicted.target);
    print_field("Calldata", &predicted.calldata);
    Ok(())
}

fn show_config(output: Option<PathBuf>, config: &GuildConfig) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            config.to_file(&path)?;
            print_success(&format!("Configuration written to {}", path.display()));
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}
