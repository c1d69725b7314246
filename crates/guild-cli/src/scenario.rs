//! Scenario files.
//!
//! A scenario deploys a fresh guild and replays a list of steps against it,
//! stopping at the first step that fails or whose expectation does not hold.
//!
//! ```toml
//! name = "first diploma"
//! automine = true
//!
//! [[step]]
//! action = "mint"
//! to = "student-1"
//! tokens = 10
//! ```
//!
//! Accounts are labels (`student-1`) or literal addresses (`guild1...`, `0x...`).

use anyhow::Context;
use guild_contracts::{Guild, ONE_TOKEN};
use guild_governance::{GovernorSettings, ProposalState};
use guild_types::{Address, Hash};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::config::GuildConfig;
use crate::output::{format_address_short, format_mkt};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Run every write step in its own block
    #[serde(default)]
    pub automine: bool,
    /// Overrides the configured deployer
    pub deployer: Option<String>,
    /// Overrides the configured governor settings
    pub governor: Option<GovernorSettings>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read scenario '{}': {}", path.display(), e))?;
        Self::from_toml_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse scenario '{}': {}", path.display(), e))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

fn default_support() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Deployer mints whole marking tokens to `to`
    Mint { to: String, tokens: u64 },
    /// `from` delegates to `to`, or to itself when `to` is omitted
    Delegate { from: String, to: Option<String> },
    /// Submit `project` for review; passing mints a diploma to `recipient`
    Propose {
        proposer: String,
        recipient: String,
        uri: String,
        project: String,
    },
    Vote {
        voter: String,
        project: String,
        #[serde(default = "default_support")]
        support: u8,
        #[serde(default)]
        reason: String,
    },
    Mine { blocks: u64 },
    AdvanceTime { seconds: u64 },
    Queue { project: String },
    Execute { project: String },
    Cancel { caller: String, project: String },
    /// `state` is a name (`Succeeded`) or code (`4`)
    ExpectState { project: String, state: String },
    /// Current voting weight, in whole tokens
    ExpectVotes { account: String, tokens: u64 },
    ExpectDiplomas { account: String, count: u64 },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Mint { .. } => "mint",
            Step::Delegate { .. } => "delegate",
            Step::Propose { .. } => "propose",
            Step::Vote { .. } => "vote",
            Step::Mine { .. } => "mine",
            Step::AdvanceTime { .. } => "advance_time",
            Step::Queue { .. } => "queue",
            Step::Execute { .. } => "execute",
            Step::Cancel { .. } => "cancel",
            Step::ExpectState { .. } => "expect_state",
            Step::ExpectVotes { .. } => "expect_votes",
            Step::ExpectDiplomas { .. } => "expect_diplomas",
        }
    }
}

/// Outcome of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub action: &'static str,
    pub block: u64,
    pub detail: String,
}

/// A submitted project, keyed by its description.
#[derive(Debug, Clone)]
struct Project {
    id: Hash,
    recipient: Address,
    uri: String,
}

pub struct ScenarioRunner {
    guild: Guild,
    deployer: Address,
    projects: HashMap<String, Project>,
}

/// Resolve an account label or literal address.
pub fn resolve_account(account: &str) -> anyhow::Result<Address> {
    let bech32_prefix = format!("{}1", Address::BECH32_HRP);
    if account.starts_with(&bech32_prefix) || account.starts_with("0x") {
        return account
            .parse::<Address>()
            .map_err(|e| anyhow::anyhow!("Invalid address '{}': {}", account, e));
    }
    if account.trim().is_empty() {
        anyhow::bail!("Account label cannot be empty");
    }
    Ok(Address::from_label(account))
}

impl ScenarioRunner {
    /// Deploy a guild for `scenario`. `force_automine` turns automine on
    /// regardless of the scenario file.
    pub fn new(scenario: &Scenario, config: &GuildConfig, force_automine: bool) -> anyhow::Result<Self> {
        let deployer_label = scenario.deployer.as_deref().unwrap_or(&config.deployer);
        let deployer = resolve_account(deployer_label)?;
        let settings = scenario.governor.clone().unwrap_or_else(|| config.governor.clone());

        let guild = Guild::deploy(deployer, settings)
            .context("Failed to deploy guild")?
            .with_automine(scenario.automine || force_automine);

        Ok(Self {
            guild,
            deployer,
            projects: HashMap::new(),
        })
    }

    pub fn guild(&self) -> &Guild {
        &self.guild
    }

    /// Run all steps, stopping at the first failure.
    pub fn run(&mut self, steps: &[Step]) -> anyhow::Result<Vec<StepReport>> {
        let mut reports = Vec::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            let index = i + 1;
            let detail = self
                .run_step(step)
                .with_context(|| format!("step {} ({}) failed", index, step.name()))?;
            let block = self.guild.governor.read(|g| g.block_number());

            info!(step = index, action = step.name(), block, "step completed");
            reports.push(StepReport {
                index,
                action: step.name(),
                block,
                detail,
            });
        }
        Ok(reports)
    }

    /// Current state of every proposed project, by description.
    pub fn project_states(&self) -> anyhow::Result<Vec<(String, ProposalState)>> {
        let mut states = Vec::with_capacity(self.projects.len());
        for (name, project) in &self.projects {
            states.push((name.clone(), self.guild.governor.state(&project.id)?));
        }
        states.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(states)
    }

    fn project(&self, project: &str) -> anyhow::Result<&Project> {
        self.projects
            .get(project)
            .ok_or_else(|| anyhow::anyhow!("Project '{}' was never proposed", project))
    }

    /// Run one step and describe what happened.
    pub fn run_step(&mut self, step: &Step) -> anyhow::Result<String> {
        debug!(action = step.name(), "running step");
        let governor = &self.guild.governor;

        match step {
            Step::Mint { to, tokens } => {
                let to = resolve_account(to)?;
                let amount = (*tokens as u128) * ONE_TOKEN;
                let deployer = self.deployer;
                governor.transact(|g| g.mint(deployer, to, amount))?;
                Ok(format!("minted {} to {}", format_mkt(amount), format_address_short(&to)))
            }

            Step::Delegate { from, to } => {
                let from = resolve_account(from)?;
                let to = match to {
                    Some(to) => resolve_account(to)?,
                    None => from,
                };
                governor.transact(|g| {
                    g.delegate(from, to);
                    Ok(())
                })?;
                Ok(format!(
                    "{} delegates to {}",
                    format_address_short(&from),
                    format_address_short(&to)
                ))
            }

            Step::Propose { proposer, recipient, uri, project } => {
                if let Some(existing) = self.projects.get(project) {
                    anyhow::bail!(
                        "project '{}' already names proposal {}; later steps could not tell them apart",
                        project,
                        existing.id
                    );
                }
                let proposer = resolve_account(proposer)?;
                let recipient = resolve_account(recipient)?;
                let id = self.guild.submit_project(proposer, recipient, uri, project)?;
                self.projects.insert(
                    project.clone(),
                    Project {
                        id,
                        recipient,
                        uri: uri.clone(),
                    },
                );
                Ok(format!("proposal {}", id))
            }

            Step::Vote { voter, project, support, reason } => {
                let voter = resolve_account(voter)?;
                let id = self.project(project)?.id;
                let weight = governor.transact(|g| g.cast_vote_with_reason(voter, id, *support, reason))?;
                Ok(format!(
                    "{} voted {} with {}",
                    format_address_short(&voter),
                    support,
                    format_mkt(weight)
                ))
            }

            Step::Mine { blocks } => {
                governor.mine(*blocks);
                Ok(format!("mined {} block(s)", blocks))
            }

            Step::AdvanceTime { seconds } => {
                governor.transact(|g| {
                    g.advance_time(*seconds);
                    Ok(())
                })?;
                Ok(format!("advanced {}s", seconds))
            }

            Step::Queue { project } => {
                let p = self.project(project)?.clone();
                let eta = self.guild.queue_project(p.recipient, &p.uri, project)?;
                Ok(format!("queued, eta {}", eta))
            }

            Step::Execute { project } => {
                let p = self.project(project)?.clone();
                self.guild.execute_project(p.recipient, &p.uri, project)?;
                Ok(format!("executed, diploma minted to {}", format_address_short(&p.recipient)))
            }

            Step::Cancel { caller, project } => {
                let caller = resolve_account(caller)?;
                let id = self.project(project)?.id;
                governor.transact(|g| g.cancel(caller, id))?;
                Ok("canceled".to_string())
            }

            Step::ExpectState { project, state } => {
                let expected: ProposalState = state
                    .parse()
                    .map_err(|e: String| anyhow::anyhow!(e))?;
                let id = self.project(project)?.id;
                let actual = governor.state(&id)?;
                if actual != expected {
                    anyhow::bail!("expected state {}, got {}", expected.name(), actual.name());
                }
                Ok(format!("state is {}", actual.name()))
            }

            Step::ExpectVotes { account, tokens } => {
                let account = resolve_account(account)?;
                let expected = (*tokens as u128) * ONE_TOKEN;
                let actual = governor.read(|g| g.get_votes(&account));
                if actual != expected {
                    anyhow::bail!(
                        "expected {} votes, got {}",
                        format_mkt(expected),
                        format_mkt(actual)
                    );
                }
                Ok(format!("{} holds {} votes", format_address_short(&account), format_mkt(actual)))
            }

            Step::ExpectDiplomas { account, count } => {
                let account = resolve_account(account)?;
                let actual = self.guild.diplomas_of(&account);
                if actual != *count {
                    anyhow::bail!("expected {} diploma(s), got {}", count, actual);
                }
                Ok(format!("{} holds {} diploma(s)", format_address_short(&account), actual))
            }
        }
    }
}
