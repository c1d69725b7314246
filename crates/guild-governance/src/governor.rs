//! Proposal engine.
//!
//! Owns the ballot ledger, the timelock gate and the action executor, plus
//! the chain clock they all read. Every public operation either completes
//! or leaves the engine exactly as it found it; the single exception is a
//! reverted action during `execute` (see [`crate::executor`]).

use std::collections::HashMap;

use guild_types::{Address, BlockNumber, Hash, Timestamp};
use tracing::{debug, info};

use crate::access::{Authorizer, Role, RoleRegistry};
use crate::clock::ChainClock;
use crate::error::{GovernanceError, Result};
use crate::events::GovernorEvent;
use crate::executor::ActionExecutor;
use crate::ledger::{BalanceLedger, VotesLedger};
use crate::proposal::{
    hash_description, hash_proposal, validate_actions, Ballot, Proposal, ProposalState, VoteSupport,
};
use crate::settings::GovernorSettings;
use crate::timelock::{hash_operation, Timelock};

#[derive(Debug)]
pub struct Governor<B> {
    address: Address,
    settings: GovernorSettings,
    clock: ChainClock,
    ledger: VotesLedger<B>,
    timelock: Timelock,
    executor: ActionExecutor,
    roles: RoleRegistry,
    proposals: HashMap<Hash, Proposal>,
    order: Vec<Hash>,
    events: Vec<GovernorEvent>,
}

impl<B: BalanceLedger> Governor<B> {
    /// Assemble an engine.
    ///
    /// `address` is the engine's identity; the timelock must already grant it
    /// `Proposer` and `Executor`. `roles` decides who may cancel.
    pub fn new(
        address: Address,
        settings: GovernorSettings,
        ledger: VotesLedger<B>,
        mut timelock: Timelock,
        executor: ActionExecutor,
        roles: RoleRegistry,
    ) -> Result<Self> {
        settings.validate()?;
        timelock.bind(address)?;

        info!(
            governor = %address,
            timelock = %timelock.address(),
            voting_delay = settings.voting_delay,
            voting_period = settings.voting_period,
            "governor initialized"
        );

        Ok(Self {
            address,
            clock: ChainClock::new(settings.block_time),
            settings,
            ledger,
            timelock,
            executor,
            roles,
            proposals: HashMap::new(),
            order: Vec::new(),
            events: Vec::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn settings(&self) -> &GovernorSettings {
        &self.settings
    }

    // ── clock ────────────────────────────────────────────────────────────

    pub fn clock(&self) -> &ChainClock {
        &self.clock
    }

    pub fn block_number(&self) -> BlockNumber {
        self.clock.block()
    }

    pub fn timestamp(&self) -> Timestamp {
        self.clock.timestamp()
    }

    pub fn mine(&mut self, blocks: u64) {
        self.clock.mine(blocks);
    }

    pub fn advance_time(&mut self, seconds: u64) {
        self.clock.advance_time(seconds);
    }

    /// Undo the block opened for a failed transaction.
    pub(crate) fn restore_clock(&mut self, clock: ChainClock) {
        self.clock = clock;
    }

    // ── components ───────────────────────────────────────────────────────

    pub fn ledger(&self) -> &VotesLedger<B> {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut VotesLedger<B> {
        &mut self.ledger
    }

    pub fn timelock(&self) -> &Timelock {
        &self.timelock
    }

    pub fn timelock_mut(&mut self) -> &mut Timelock {
        &mut self.timelock
    }

    pub fn executor_mut(&mut self) -> &mut ActionExecutor {
        &mut self.executor
    }

    pub fn roles_mut(&mut self) -> &mut RoleRegistry {
        &mut self.roles
    }

    // ── ballot ledger, at the current block ──────────────────────────────

    pub fn mint(&mut self, caller: Address, account: Address, amount: u128) -> Result<()> {
        let block = self.clock.block();
        self.ledger.mint(caller, account, amount, block)
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<()> {
        let block = self.clock.block();
        self.ledger.transfer(from, to, amount, block)
    }

    pub fn delegate(&mut self, delegator: Address, delegatee: Address) {
        let block = self.clock.block();
        self.ledger.delegate(delegator, delegatee, block);
    }

    pub fn get_votes(&self, account: &Address) -> u128 {
        self.ledger.get_votes(account)
    }

    pub fn get_past_votes(&self, account: &Address, at_block: BlockNumber) -> Result<u128> {
        self.ledger.get_past_votes(account, at_block, self.clock.block())
    }

    /// Quorum for a snapshot taken at `at_block`.
    pub fn quorum(&self, at_block: BlockNumber) -> Result<u128> {
        let supply = self.ledger.get_past_total_supply(at_block, self.clock.block())?;
        Ok(self.settings.quorum.quorum(supply))
    }

    // ── proposals ────────────────────────────────────────────────────────

    /// Submit a proposal and return its id.
    ///
    /// A `ProposalCreated` event carrying the id is appended to the log.
    pub fn propose(
        &mut self,
        proposer: Address,
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        description: &str,
    ) -> Result<Hash> {
        validate_actions(&targets, &values, &calldatas)?;

        let description_hash = hash_description(description);
        let proposal_id = hash_proposal(&targets, &values, &calldatas, &description_hash)?;

        if self.proposals.contains_key(&proposal_id) {
            return Err(GovernanceError::DuplicateProposal(proposal_id));
        }

        let block = self.clock.block();
        let threshold = self.settings.proposal_threshold as u128;
        if threshold > 0 {
            let votes = match block.checked_sub(1) {
                Some(previous) => self.ledger.get_past_votes(&proposer, previous, block)?,
                None => 0,
            };
            if votes < threshold {
                return Err(GovernanceError::BelowProposalThreshold { votes, threshold });
            }
        }

        let vote_start = block.saturating_add(self.settings.voting_delay);
        let vote_end = vote_start.saturating_add(self.settings.voting_period);

        let proposal = Proposal {
            id: proposal_id,
            proposer,
            targets: targets.clone(),
            values: values.clone(),
            calldatas: calldatas.clone(),
            description: description.to_string(),
            description_hash,
            created_block: block,
            snapshot_block: block,
            vote_start,
            vote_end,
            for_votes: 0,
            against_votes: 0,
            abstain_votes: 0,
            ballots: HashMap::new(),
            timelock_id: None,
            eta: None,
            applied: 0,
            executed: false,
            canceled: false,
        };

        self.proposals.insert(proposal_id, proposal);
        self.order.push(proposal_id);
        self.events.push(GovernorEvent::ProposalCreated {
            proposal_id,
            proposer,
            targets,
            values,
            calldatas,
            vote_start,
            vote_end,
            description: description.to_string(),
        });

        info!(
            proposal_id = %proposal_id,
            proposer = %proposer,
            vote_start,
            vote_end,
            "proposal created"
        );
        Ok(proposal_id)
    }

    /// Current state of a proposal, derived from the clock and tallies.
    pub fn state(&self, proposal_id: &Hash) -> Result<ProposalState> {
        let proposal = self
            .proposals
            .get(proposal_id)
            .ok_or(GovernanceError::UnknownProposal(*proposal_id))?;
        Ok(self.derive_state(proposal))
    }

    fn derive_state(&self, proposal: &Proposal) -> ProposalState {
        if proposal.executed {
            return ProposalState::Executed;
        }
        if proposal.canceled {
            return ProposalState::Canceled;
        }

        let block = self.clock.block();
        if block <= proposal.vote_start {
            return ProposalState::Pending;
        }
        if block <= proposal.vote_end {
            return ProposalState::Active;
        }

        // Past vote_end, so the snapshot block is already mined.
        let supply = self.ledger.supply_at(proposal.snapshot_block);
        let quorum = self.settings.quorum.quorum(supply);
        if !(proposal.quorum_reached(quorum) && proposal.vote_succeeded()) {
            return ProposalState::Defeated;
        }

        match proposal.timelock_id {
            None => ProposalState::Succeeded,
            Some(op) if self.timelock.is_done(&op) => ProposalState::Executed,
            Some(op) if self.timelock.is_pending(&op) => ProposalState::Queued,
            // Operation canceled directly on the timelock.
            Some(_) => ProposalState::Canceled,
        }
    }

    /// Cast a ballot. `support` is 0 (against), 1 (for) or 2 (abstain).
    /// Returns the weight counted.
    pub fn cast_vote(&mut self, voter: Address, proposal_id: Hash, support: u8) -> Result<u128> {
        self.cast_vote_with_reason(voter, proposal_id, support, "")
    }

    pub fn cast_vote_with_reason(
        &mut self,
        voter: Address,
        proposal_id: Hash,
        support: u8,
        reason: &str,
    ) -> Result<u128> {
        let support = VoteSupport::try_from(support)?;

        let proposal = self
            .proposals
            .get(&proposal_id)
            .ok_or(GovernanceError::UnknownProposal(proposal_id))?;

        let state = self.derive_state(proposal);
        if state != ProposalState::Active {
            return Err(GovernanceError::VotingClosed(state));
        }
        if proposal.has_voted(&voter) {
            return Err(GovernanceError::DuplicateVote { proposal_id, voter });
        }

        let weight = self
            .ledger
            .get_past_votes(&voter, proposal.snapshot_block, self.clock.block())?;

        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::UnknownProposal(proposal_id))?;
        proposal.record_ballot(voter, Ballot { support, weight });

        self.events.push(GovernorEvent::VoteCast {
            voter,
            proposal_id,
            support,
            weight,
            reason: reason.to_string(),
        });

        debug!(proposal_id = %proposal_id, voter = %voter, ?support, weight, "vote cast");
        Ok(weight)
    }

    /// Hand a succeeded proposal to the timelock. Returns its ETA.
    pub fn queue(
        &mut self,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        description_hash: Hash,
    ) -> Result<Timestamp> {
        let proposal_id = hash_proposal(targets, values, calldatas, &description_hash)?;
        let proposal = self
            .proposals
            .get(&proposal_id)
            .ok_or(GovernanceError::IdMismatch(proposal_id))?;

        let state = self.derive_state(proposal);
        if state != ProposalState::Succeeded {
            return Err(GovernanceError::UnexpectedState {
                expected: ProposalState::Succeeded,
                actual: state,
            });
        }

        let operation = hash_operation(targets, values, calldatas, &Hash::ZERO, &description_hash)?;
        let delay = self.timelock.min_delay();
        let eta = self
            .timelock
            .schedule(self.address, operation, delay, self.clock.timestamp())?;

        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::IdMismatch(proposal_id))?;
        proposal.timelock_id = Some(operation);
        proposal.eta = Some(eta);

        self.events.push(GovernorEvent::ProposalQueued { proposal_id, eta });
        info!(proposal_id = %proposal_id, operation = %operation.short(), eta, "proposal queued");
        Ok(eta)
    }

    /// Run a queued proposal's actions through the timelock.
    ///
    /// On `ActionReverted` the proposal stays queued and earlier actions keep
    /// their effects. The next call resumes at the reverted action.
    pub fn execute(
        &mut self,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
        description_hash: Hash,
    ) -> Result<Vec<Vec<u8>>> {
        let proposal_id = hash_proposal(targets, values, calldatas, &description_hash)?;
        let proposal = self
            .proposals
            .get(&proposal_id)
            .ok_or(GovernanceError::IdMismatch(proposal_id))?;

        match self.derive_state(proposal) {
            ProposalState::Queued => {}
            ProposalState::Executed => return Err(GovernanceError::AlreadyExecuted),
            actual => {
                return Err(GovernanceError::UnexpectedState {
                    expected: ProposalState::Queued,
                    actual,
                })
            }
        }

        let operation = proposal
            .timelock_id
            .ok_or(GovernanceError::IdMismatch(proposal_id))?;
        let now = self.clock.timestamp();
        if !self.timelock.is_ready(&operation, now) {
            return Err(GovernanceError::NotReady(operation));
        }

        let start = proposal.applied;
        let outputs = match self
            .executor
            .run(self.timelock.address(), start, targets, values, calldatas)
        {
            Ok(outputs) => outputs,
            Err(GovernanceError::ActionReverted { index, reason }) => {
                if let Some(proposal) = self.proposals.get_mut(&proposal_id) {
                    proposal.applied = index;
                }
                return Err(GovernanceError::ActionReverted { index, reason });
            }
            Err(e) => return Err(e),
        };

        self.timelock.mark_executed(self.address, operation, now)?;
        if let Some(proposal) = self.proposals.get_mut(&proposal_id) {
            proposal.executed = true;
        }

        self.events.push(GovernorEvent::ProposalExecuted { proposal_id });
        info!(proposal_id = %proposal_id, actions = outputs.len(), "proposal executed");
        Ok(outputs)
    }

    /// Cancel a Pending or Active proposal.
    ///
    /// Allowed for the proposer and for holders of [`Role::Canceller`].
    pub fn cancel(&mut self, caller: Address, proposal_id: Hash) -> Result<()> {
        let proposal = self
            .proposals
            .get(&proposal_id)
            .ok_or(GovernanceError::UnknownProposal(proposal_id))?;

        if caller != proposal.proposer && !self.roles.has_role(Role::Canceller, &caller) {
            return Err(GovernanceError::Unauthorized(format!(
                "{} may not cancel {}",
                caller, proposal_id
            )));
        }

        let state = self.derive_state(proposal);
        if !matches!(state, ProposalState::Pending | ProposalState::Active) {
            return Err(GovernanceError::UnexpectedState {
                expected: ProposalState::Active,
                actual: state,
            });
        }

        if let Some(proposal) = self.proposals.get_mut(&proposal_id) {
            proposal.canceled = true;
        }

        self.events.push(GovernorEvent::ProposalCanceled { proposal_id });
        info!(proposal_id = %proposal_id, canceller = %caller, "proposal canceled");
        Ok(())
    }

    // ── views ────────────────────────────────────────────────────────────

    pub fn proposal(&self, proposal_id: &Hash) -> Option<&Proposal> {
        self.proposals.get(proposal_id)
    }

    fn require(&self, proposal_id: &Hash) -> Result<&Proposal> {
        self.proposals
            .get(proposal_id)
            .ok_or(GovernanceError::UnknownProposal(*proposal_id))
    }

    pub fn proposal_snapshot(&self, proposal_id: &Hash) -> Result<BlockNumber> {
        Ok(self.require(proposal_id)?.snapshot_block)
    }

    pub fn proposal_deadline(&self, proposal_id: &Hash) -> Result<BlockNumber> {
        Ok(self.require(proposal_id)?.vote_end)
    }

    pub fn proposal_proposer(&self, proposal_id: &Hash) -> Result<Address> {
        Ok(self.require(proposal_id)?.proposer)
    }

    /// ETA once queued.
    pub fn proposal_eta(&self, proposal_id: &Hash) -> Result<Option<Timestamp>> {
        Ok(self.require(proposal_id)?.eta)
    }

    /// Against, for and abstain tallies.
    pub fn proposal_votes(&self, proposal_id: &Hash) -> Result<(u128, u128, u128)> {
        Ok(self.require(proposal_id)?.votes())
    }

    pub fn has_voted(&self, proposal_id: &Hash, account: &Address) -> Result<bool> {
        Ok(self.require(proposal_id)?.has_voted(account))
    }

    /// Proposal ids in submission order.
    pub fn proposal_ids(&self) -> &[Hash] {
        &self.order
    }

    pub fn events(&self) -> &[GovernorEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<GovernorEvent> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ActionTarget;
    use crate::ledger::tests::{addr, Balances};
    use crate::settings::QuorumRule;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use std::sync::Arc;

    /// Counts successful calls per recipient byte; fails when paused or
    /// when the calldata starts with `reject`.
    #[derive(Default)]
    struct Counter {
        hits: Vec<u8>,
        paused: bool,
        reject: Option<u8>,
    }

    impl ActionTarget for Counter {
        fn call(&mut self, _caller: Address, _value: u128, calldata: &[u8]) -> std::result::Result<Vec<u8>, String> {
            if self.paused {
                return Err("paused".into());
            }
            if self.reject.is_some() && calldata.first().copied() == self.reject {
                return Err("rejected".into());
            }
            self.hits.extend_from_slice(calldata);
            Ok(vec![1])
        }
    }

    struct Fixture {
        governor: Governor<Balances>,
        admin: Address,
        target: Address,
        counter: Arc<Mutex<Counter>>,
    }

    const TEN: u128 = 10_000_000_000_000_000_000;

    fn fixture(settings: GovernorSettings) -> Fixture {
        let admin = addr(100);
        let governor_addr = addr(101);
        let timelock_addr = addr(102);
        let target = addr(103);

        let mut token_roles = RoleRegistry::new(admin);
        token_roles.grant_role(admin, Role::Minter, admin).unwrap();
        let ledger = VotesLedger::new(Balances::default(), token_roles);

        let mut timelock_roles = RoleRegistry::new(admin);
        timelock_roles.grant_role(admin, Role::Proposer, governor_addr).unwrap();
        timelock_roles.grant_role(admin, Role::Executor, governor_addr).unwrap();
        let timelock = Timelock::new(timelock_addr, settings.timelock_min_delay, timelock_roles);

        let counter = Arc::new(Mutex::new(Counter::default()));
        let mut executor = ActionExecutor::new();
        executor.register(target, counter.clone());

        let governor = Governor::new(
            governor_addr,
            settings,
            ledger,
            timelock,
            executor,
            RoleRegistry::new(admin),
        )
        .unwrap();

        Fixture { governor, admin, target, counter }
    }

    /// Mint 10 to `voter` and self-delegate, one block each.
    fn fund(f: &mut Fixture, voter: Address) {
        f.governor.mint(f.admin, voter, TEN).unwrap();
        f.governor.mine(1);
        f.governor.delegate(voter, voter);
        f.governor.mine(1);
    }

    fn propose(f: &mut Fixture, description: &str) -> Hash {
        f.governor
            .propose(addr(1), vec![f.target], vec![0], vec![vec![7]], description)
            .unwrap()
    }

    #[test]
    fn test_governor_requires_timelock_roles() {
        let admin = addr(100);
        let ledger = VotesLedger::new(Balances::default(), RoleRegistry::new(admin));
        let timelock = Timelock::new(addr(102), 0, RoleRegistry::new(admin));
        let result = Governor::new(
            addr(101),
            GovernorSettings::default(),
            ledger,
            timelock,
            ActionExecutor::new(),
            RoleRegistry::new(admin),
        );
        assert!(matches!(result, Err(GovernanceError::Unauthorized(_))));
    }

    #[test]
    fn test_propose_emits_created_event() {
        let mut f = fixture(GovernorSettings::default());
        let id = propose(&mut f, "project");

        let created = f.governor.events().first().cloned().unwrap();
        assert_eq!(created.proposal_id(), id);
        assert!(matches!(created, GovernorEvent::ProposalCreated { .. }));
        assert_eq!(f.governor.proposal_ids(), &[id]);
    }

    #[test]
    fn test_propose_validation() {
        let mut f = fixture(GovernorSettings::default());
        let result = f.governor.propose(addr(1), vec![], vec![], vec![], "empty");
        assert!(matches!(result, Err(GovernanceError::InvalidProposal(_))));

        let target = f.target;
        let result = f.governor.propose(addr(1), vec![target], vec![0, 1], vec![vec![]], "ragged");
        assert!(matches!(result, Err(GovernanceError::InvalidProposal(_))));
    }

    #[test]
    fn test_duplicate_proposal_rejected() {
        let mut f = fixture(GovernorSettings::default());
        let id = propose(&mut f, "project");
        f.governor.mine(3);

        let target = f.target;
        let result = f.governor.propose(addr(2), vec![target], vec![0], vec![vec![7]], "project");
        assert_eq!(result, Err(GovernanceError::DuplicateProposal(id)));
    }

    #[test]
    fn test_state_unknown_proposal() {
        let f = fixture(GovernorSettings::default());
        let id = Hash::compute(b"nothing");
        assert_eq!(f.governor.state(&id), Err(GovernanceError::UnknownProposal(id)));
    }

    #[test]
    fn test_lifecycle_pending_active_succeeded() {
        let mut f = fixture(GovernorSettings::default());
        let voter = addr(1);
        fund(&mut f, voter);

        let id = propose(&mut f, "project");
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Pending);

        f.governor.mine(1);
        assert_eq!(f.governor.cast_vote(voter, id, 1).unwrap(), TEN);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Active);

        f.governor.mine(10);
        assert_eq!(f.governor.state(&id).unwrap().code(), 4);
    }

    #[test]
    fn test_voting_delay_keeps_pending() {
        let mut settings = GovernorSettings::default();
        settings.voting_delay = 3;
        let mut f = fixture(settings);
        let voter = addr(1);
        fund(&mut f, voter);

        let id = propose(&mut f, "project");
        f.governor.mine(3);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Pending);
        assert_eq!(
            f.governor.cast_vote(voter, id, 1),
            Err(GovernanceError::VotingClosed(ProposalState::Pending))
        );

        f.governor.mine(1);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Active);
    }

    #[test]
    fn test_duplicate_vote_leaves_tallies() {
        let mut f = fixture(GovernorSettings::default());
        let voter = addr(1);
        fund(&mut f, voter);
        let id = propose(&mut f, "project");
        f.governor.mine(1);

        f.governor.cast_vote(voter, id, 1).unwrap();
        let before = f.governor.proposal_votes(&id).unwrap();

        assert_eq!(
            f.governor.cast_vote(voter, id, 0),
            Err(GovernanceError::DuplicateVote { proposal_id: id, voter })
        );
        assert_eq!(f.governor.proposal_votes(&id).unwrap(), before);
        assert_eq!(before, (0, TEN, 0));
    }

    #[test]
    fn test_invalid_support() {
        let mut f = fixture(GovernorSettings::default());
        let voter = addr(1);
        fund(&mut f, voter);
        let id = propose(&mut f, "project");
        f.governor.mine(1);

        assert_eq!(f.governor.cast_vote(voter, id, 3), Err(GovernanceError::InvalidSupport(3)));
        assert!(!f.governor.has_voted(&id, &voter).unwrap());
    }

    #[test]
    fn test_vote_after_deadline_closed() {
        let mut f = fixture(GovernorSettings::default());
        let voter = addr(1);
        fund(&mut f, voter);
        let id = propose(&mut f, "project");
        f.governor.mine(6);

        assert_eq!(
            f.governor.cast_vote(voter, id, 1),
            Err(GovernanceError::VotingClosed(ProposalState::Defeated))
        );
    }

    #[test]
    fn test_voting_window_closes_after_deadline_block() {
        let mut f = fixture(GovernorSettings::default());
        let voter = addr(1);
        let late_voter = addr(2);
        fund(&mut f, voter);
        fund(&mut f, late_voter);
        let id = propose(&mut f, "project");

        let deadline = f.governor.proposal_deadline(&id).unwrap();
        let now = f.governor.block_number();
        f.governor.mine(deadline - now);
        assert_eq!(f.governor.block_number(), deadline);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Active);
        assert_eq!(f.governor.cast_vote(voter, id, 1).unwrap(), TEN);

        f.governor.mine(1);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Succeeded);
        assert_eq!(
            f.governor.cast_vote(late_voter, id, 0),
            Err(GovernanceError::VotingClosed(ProposalState::Succeeded))
        );
        assert_eq!(f.governor.proposal_votes(&id).unwrap(), (0, TEN, 0));
    }

    #[test]
    fn test_weight_frozen_at_snapshot() {
        let mut f = fixture(GovernorSettings::default());
        let voter = addr(1);
        fund(&mut f, voter);
        let id = propose(&mut f, "project");
        f.governor.mine(1);

        // Weight gained after the snapshot does not count.
        let admin = f.admin;
        f.governor.mint(admin, voter, TEN).unwrap();
        assert_eq!(f.governor.cast_vote(voter, id, 1).unwrap(), TEN);
    }

    #[test]
    fn test_defeated_without_quorum_or_majority() {
        let mut settings = GovernorSettings::default();
        settings.quorum = QuorumRule::Fixed(u128::MAX);
        let mut f = fixture(settings);
        let voter = addr(1);
        fund(&mut f, voter);
        let id = propose(&mut f, "no quorum");
        f.governor.mine(1);
        f.governor.cast_vote(voter, id, 1).unwrap();
        f.governor.mine(10);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Defeated);

        let mut f = fixture(GovernorSettings::default());
        let (yes, no) = (addr(1), addr(2));
        fund(&mut f, yes);
        fund(&mut f, no);
        let id = propose(&mut f, "tie");
        f.governor.mine(1);
        f.governor.cast_vote(yes, id, 1).unwrap();
        f.governor.cast_vote(no, id, 0).unwrap();
        f.governor.mine(10);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Defeated);
    }

    #[test]
    fn test_fraction_quorum_uses_snapshot_supply() {
        let mut settings = GovernorSettings::default();
        settings.quorum = QuorumRule::Fraction { numerator: 50, denominator: 100 };
        let mut f = fixture(settings);
        let (small, whale) = (addr(1), addr(2));
        fund(&mut f, small);
        let admin = f.admin;
        f.governor.mint(admin, whale, TEN * 3).unwrap();
        f.governor.mine(1);

        let id = propose(&mut f, "needs half");
        f.governor.mine(1);
        assert_eq!(f.governor.quorum(f.governor.proposal_snapshot(&id).unwrap()).unwrap(), TEN * 2);

        f.governor.cast_vote(small, id, 1).unwrap();
        f.governor.mine(10);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Defeated);
    }

    #[test]
    fn test_abstain_counts_toward_quorum() {
        let mut settings = GovernorSettings::default();
        settings.quorum = QuorumRule::Fixed(15);
        let mut f = fixture(settings);
        let (yes, abstain) = (addr(1), addr(2));
        let admin = f.admin;
        f.governor.mint(admin, yes, 10).unwrap();
        f.governor.mint(admin, abstain, 10).unwrap();
        f.governor.delegate(yes, yes);
        f.governor.delegate(abstain, abstain);
        f.governor.mine(1);

        let id = propose(&mut f, "abstain");
        f.governor.mine(1);
        f.governor.cast_vote(yes, id, 1).unwrap();
        f.governor.cast_vote_with_reason(abstain, id, 2, "conflict of interest").unwrap();
        f.governor.mine(10);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Succeeded);
    }

    #[test]
    fn test_queue_and_execute() {
        let mut settings = GovernorSettings::default();
        settings.timelock_min_delay = 3_600;
        let mut f = fixture(settings);
        let voter = addr(1);
        fund(&mut f, voter);
        let id = propose(&mut f, "project");
        f.governor.mine(1);
        f.governor.cast_vote(voter, id, 1).unwrap();
        f.governor.mine(10);

        let target = f.target;
        let desc = hash_description("project");
        let eta = f.governor.queue(&[target], &[0], &[vec![7]], desc).unwrap();
        assert_eq!(eta, f.governor.timestamp() + 3_600);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Queued);
        assert_eq!(f.governor.proposal_eta(&id).unwrap(), Some(eta));

        let op = f.governor.proposal(&id).unwrap().timelock_id.unwrap();
        assert_eq!(
            f.governor.execute(&[target], &[0], &[vec![7]], desc),
            Err(GovernanceError::NotReady(op))
        );
        assert!(f.counter.lock().hits.is_empty());

        f.governor.advance_time(3_600);
        f.governor.execute(&[target], &[0], &[vec![7]], desc).unwrap();
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Executed);
        assert_eq!(f.counter.lock().hits, vec![7]);

        assert_eq!(
            f.governor.execute(&[target], &[0], &[vec![7]], desc),
            Err(GovernanceError::AlreadyExecuted)
        );
        assert_eq!(f.counter.lock().hits, vec![7]);
    }

    #[test]
    fn test_queue_requires_succeeded() {
        let mut f = fixture(GovernorSettings::default());
        let voter = addr(1);
        fund(&mut f, voter);
        propose(&mut f, "project");
        f.governor.mine(1);

        let target = f.target;
        let desc = hash_description("project");
        let result = f.governor.queue(&[target], &[0], &[vec![7]], desc);
        assert!(matches!(
            result,
            Err(GovernanceError::UnexpectedState { actual: ProposalState::Active, .. })
        ));

        let wrong = hash_description("another project");
        let expected = hash_proposal(&[target], &[0], &[vec![7]], &wrong).unwrap();
        assert_eq!(
            f.governor.queue(&[target], &[0], &[vec![7]], wrong),
            Err(GovernanceError::IdMismatch(expected))
        );
    }

    #[test]
    fn test_execute_revert_keeps_queued() {
        let mut f = fixture(GovernorSettings::default());
        let voter = addr(1);
        fund(&mut f, voter);
        let id = propose(&mut f, "project");
        f.governor.mine(1);
        f.governor.cast_vote(voter, id, 1).unwrap();
        f.governor.mine(10);

        let target = f.target;
        let desc = hash_description("project");
        f.governor.queue(&[target], &[0], &[vec![7]], desc).unwrap();

        f.counter.lock().paused = true;
        let result = f.governor.execute(&[target], &[0], &[vec![7]], desc);
        assert!(matches!(result, Err(GovernanceError::ActionReverted { index: 0, .. })));
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Queued);

        f.counter.lock().paused = false;
        f.governor.execute(&[target], &[0], &[vec![7]], desc).unwrap();
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Executed);
    }

    #[test]
    fn test_retry_resumes_after_reverted_action() {
        let mut f = fixture(GovernorSettings::default());
        let voter = addr(1);
        fund(&mut f, voter);

        let target = f.target;
        let targets = [target, target];
        let calldatas = [vec![7], vec![9]];
        let id = f
            .governor
            .propose(addr(1), targets.to_vec(), vec![0, 0], calldatas.to_vec(), "two actions")
            .unwrap();
        f.governor.mine(1);
        f.governor.cast_vote(voter, id, 1).unwrap();
        f.governor.mine(10);

        let desc = hash_description("two actions");
        f.governor.queue(&targets, &[0, 0], &calldatas, desc).unwrap();

        f.counter.lock().reject = Some(9);
        for _ in 0..3 {
            let result = f.governor.execute(&targets, &[0, 0], &calldatas, desc);
            assert!(matches!(result, Err(GovernanceError::ActionReverted { index: 1, .. })));
            assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Queued);
        }
        // The first action took effect once, however many retries failed.
        assert_eq!(f.counter.lock().hits, vec![7]);
        assert_eq!(f.governor.proposal(&id).unwrap().applied, 1);

        f.counter.lock().reject = None;
        let outputs = f.governor.execute(&targets, &[0, 0], &calldatas, desc).unwrap();
        assert_eq!(outputs, vec![vec![1]]);
        assert_eq!(f.counter.lock().hits, vec![7, 9]);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Executed);
    }

    #[test]
    fn test_cancel_rules() {
        let mut f = fixture(GovernorSettings::default());
        let voter = addr(1);
        fund(&mut f, voter);
        let id = propose(&mut f, "project");

        assert!(matches!(f.governor.cancel(addr(9), id), Err(GovernanceError::Unauthorized(_))));

        f.governor.cancel(addr(1), id).unwrap();
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Canceled);

        f.governor.mine(1);
        assert_eq!(
            f.governor.cast_vote(voter, id, 1),
            Err(GovernanceError::VotingClosed(ProposalState::Canceled))
        );
        assert!(f.governor.cancel(addr(1), id).is_err());
    }

    #[test]
    fn test_canceller_role_may_cancel_active() {
        let mut f = fixture(GovernorSettings::default());
        let admin = f.admin;
        let guardian = addr(50);
        f.governor.roles_mut().grant_role(admin, Role::Canceller, guardian).unwrap();

        let id = propose(&mut f, "project");
        f.governor.mine(1);
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Active);
        f.governor.cancel(guardian, id).unwrap();
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Canceled);
    }

    #[test]
    fn test_proposal_threshold() {
        let mut settings = GovernorSettings::default();
        settings.proposal_threshold = 5;
        let mut f = fixture(settings);
        let target = f.target;

        let result = f.governor.propose(addr(1), vec![target], vec![0], vec![vec![1]], "early");
        assert!(matches!(result, Err(GovernanceError::BelowProposalThreshold { .. })));

        fund(&mut f, addr(1));
        assert!(f.governor.propose(addr(1), vec![target], vec![0], vec![vec![1]], "funded").is_ok());
    }

    #[test]
    fn test_timelock_cancel_reports_canceled() {
        let mut f = fixture(GovernorSettings::default());
        let voter = addr(1);
        fund(&mut f, voter);
        let id = propose(&mut f, "project");
        f.governor.mine(1);
        f.governor.cast_vote(voter, id, 1).unwrap();
        f.governor.mine(10);

        let target = f.target;
        f.governor.queue(&[target], &[0], &[vec![7]], hash_description("project")).unwrap();

        let admin = f.admin;
        let op = f.governor.proposal(&id).unwrap().timelock_id.unwrap();
        f.governor.timelock_mut().roles_mut().grant_role(admin, Role::Canceller, admin).unwrap();
        f.governor.timelock_mut().cancel(admin, op).unwrap();
        assert_eq!(f.governor.state(&id).unwrap(), ProposalState::Canceled);
    }

    proptest! {
        #[test]
        fn prop_state_read_is_idempotent(mined in 0u64..20, support in 0u8..3) {
            let mut f = fixture(GovernorSettings::default());
            let voter = addr(1);
            fund(&mut f, voter);
            let id = propose(&mut f, "project");
            f.governor.mine(1);
            f.governor.cast_vote(voter, id, support).unwrap();
            f.governor.mine(mined);

            let first = f.governor.state(&id).unwrap();
            for _ in 0..3 {
                prop_assert_eq!(f.governor.state(&id).unwrap(), first);
            }
        }
    }
}
