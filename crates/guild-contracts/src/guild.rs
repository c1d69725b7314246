//! Guild deployment.
//!
//! Wires token, diploma contract, timelock and governor together the way a
//! fresh guild is set up:
//! - the deployer may mint marking tokens
//! - the timelock starts with the deployer as proposer and executor, and the
//!   governor is granted both roles before binding
//! - the timelock holds `Minter` and `Pauser` on the diploma contract

use std::sync::Arc;

use guild_governance::{
    hash_description, hash_proposal, ActionExecutor, GovernanceError, Governor, GovernorSettings,
    Result, Role, RoleRegistry, SharedGovernor, Timelock, VotesLedger,
};
use guild_types::{Address, Hash};
use parking_lot::Mutex;
use tracing::info;

use crate::calldata::{CallError, DiplomaCall};
use crate::diploma_nft::DiplomaNft;
use crate::marking_token::MarkingToken;

/// Deployment addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildAddresses {
    pub deployer: Address,
    pub token: Address,
    pub diploma: Address,
    pub timelock: Address,
    pub governor: Address,
}

impl GuildAddresses {
    /// Contract addresses derived from their labels; only the deployer varies.
    pub fn derive(deployer: Address) -> Self {
        Self {
            deployer,
            token: Address::from_label("marking-token"),
            diploma: Address::from_label("diploma-nft"),
            timelock: Address::from_label("diploma-timelock"),
            governor: Address::from_label("diploma-governor"),
        }
    }
}

/// Actions that mint one diploma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectActions {
    pub targets: Vec<Address>,
    pub values: Vec<u128>,
    pub calldatas: Vec<Vec<u8>>,
}

impl ProjectActions {
    /// A single `safe_mint` on the diploma contract at `diploma`.
    pub fn mint_diploma(
        diploma: Address,
        recipient: Address,
        uri: &str,
    ) -> std::result::Result<Self, CallError> {
        Ok(Self {
            targets: vec![diploma],
            values: vec![0],
            calldatas: vec![DiplomaCall::safe_mint(recipient, uri).encode()?],
        })
    }

    /// Proposal id these actions get when submitted with `description`.
    pub fn proposal_id(&self, description: &str) -> Result<Hash> {
        hash_proposal(
            &self.targets,
            &self.values,
            &self.calldatas,
            &hash_description(description),
        )
    }
}

#[derive(Clone)]
pub struct Guild {
    pub addresses: GuildAddresses,
    pub governor: SharedGovernor<MarkingToken>,
    pub diploma: Arc<Mutex<DiplomaNft>>,
}

impl Guild {
    pub fn deploy(deployer: Address, settings: GovernorSettings) -> Result<Self> {
        let addresses = GuildAddresses::derive(deployer);

        let mut token_roles = RoleRegistry::new(deployer);
        token_roles.grant_role(deployer, Role::Minter, deployer)?;
        let ledger = VotesLedger::new(MarkingToken::new(), token_roles);

        let mut timelock_roles = RoleRegistry::new(deployer);
        for role in [Role::Proposer, Role::Executor] {
            timelock_roles.grant_role(deployer, role, deployer)?;
            timelock_roles.grant_role(deployer, role, addresses.governor)?;
        }
        let timelock = Timelock::new(addresses.timelock, settings.timelock_min_delay, timelock_roles);

        let mut diploma_roles = RoleRegistry::new(deployer);
        diploma_roles.grant_role(deployer, Role::Minter, addresses.timelock)?;
        diploma_roles.grant_role(deployer, Role::Pauser, addresses.timelock)?;
        let diploma = Arc::new(Mutex::new(DiplomaNft::new(diploma_roles)));

        let mut executor = ActionExecutor::new();
        executor.register(addresses.diploma, diploma.clone());

        let governor = Governor::new(
            addresses.governor,
            settings,
            ledger,
            timelock,
            executor,
            RoleRegistry::new(deployer),
        )?;

        info!(
            deployer = %deployer,
            governor = %addresses.governor,
            diploma = %addresses.diploma,
            "guild deployed"
        );

        Ok(Self {
            addresses,
            governor: SharedGovernor::new(governor),
            diploma,
        })
    }

    /// Run every governor transaction in its own freshly mined block.
    pub fn with_automine(mut self, automine: bool) -> Self {
        self.governor = self.governor.with_automine(automine);
        self
    }

    /// The action bundle that mints a diploma for `recipient`.
    pub fn project_actions(&self, recipient: Address, uri: &str) -> Result<ProjectActions> {
        ProjectActions::mint_diploma(self.addresses.diploma, recipient, uri)
            .map_err(|e| GovernanceError::InvalidProposal(e.to_string()))
    }

    /// Submit a project for marking. `project_url` is the proposal description.
    pub fn submit_project(
        &self,
        proposer: Address,
        recipient: Address,
        uri: &str,
        project_url: &str,
    ) -> Result<Hash> {
        let actions = self.project_actions(recipient, uri)?;
        self.governor.transact(|g| {
            g.propose(
                proposer,
                actions.targets,
                actions.values,
                actions.calldatas,
                project_url,
            )
        })
    }

    pub fn queue_project(&self, recipient: Address, uri: &str, project_url: &str) -> Result<u64> {
        let actions = self.project_actions(recipient, uri)?;
        let description_hash = hash_description(project_url);
        self.governor.transact(|g| {
            g.queue(&actions.targets, &actions.values, &actions.calldatas, description_hash)
        })
    }

    pub fn execute_project(&self, recipient: Address, uri: &str, project_url: &str) -> Result<()> {
        let actions = self.project_actions(recipient, uri)?;
        let description_hash = hash_description(project_url);
        self.governor
            .transact(|g| {
                g.execute(&actions.targets, &actions.values, &actions.calldatas, description_hash)
            })
            .map(|_| ())
    }

    /// Diplomas held by `account`.
    pub fn diplomas_of(&self, account: &Address) -> u64 {
        self.diploma.lock().balance_of(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guild_governance::{Authorizer, ProposalState};

    #[test]
    fn test_deploy_wires_roles() {
        let deployer = Address::from_label("deployer");
        let guild = Guild::deploy(deployer, GovernorSettings::default()).unwrap();
        let a = guild.addresses;

        assert!(guild.diploma.lock().has_role(Role::Minter, &a.timelock));
        assert!(!guild.diploma.lock().has_role(Role::Minter, &deployer));

        guild.governor.read(|g| {
            assert_eq!(g.timelock().bound(), Some(a.governor));
            assert!(g.timelock().roles().has_role(Role::Proposer, &deployer));
            assert!(g.ledger().roles().has_role(Role::Minter, &deployer));
        });
    }

    #[test]
    fn test_submit_project_is_pending() {
        let deployer = Address::from_label("deployer");
        let guild = Guild::deploy(deployer, GovernorSettings::default()).unwrap();
        let student = Address::from_label("student-2");

        let id = guild
            .submit_project(student, student, "ipfs://diploma", "https://github.com/guild/project")
            .unwrap();
        assert_eq!(guild.governor.state(&id).unwrap(), ProposalState::Pending);

        let actions = guild.project_actions(student, "ipfs://diploma").unwrap();
        assert_eq!(actions.proposal_id("https://github.com/guild/project").unwrap(), id);
    }
}
