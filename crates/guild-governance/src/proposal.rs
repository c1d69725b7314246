//! Proposal model and content-hash identifiers.
//!
//! Proposals go through: Pending -> Active -> Succeeded/Defeated -> Queued -> Executed,
//! with Canceled reachable from Pending or Active.

use std::collections::HashMap;

use borsh::BorshSerialize;
use guild_types::{Address, BlockNumber, Hash, Timestamp};

use crate::error::{GovernanceError, Result};

/// Domain tag mixed into every proposal id.
pub const PROPOSAL_DOMAIN: &[u8] = b"guild.governor.proposal.v1";

/// Proposal lifecycle state. Discriminants are the external state codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ProposalState {
    Pending = 0,
    Active = 1,
    Canceled = 2,
    Defeated = 3,
    Succeeded = 4,
    Queued = 5,
    /// Reserved code; this engine never expires queued proposals.
    Expired = 6,
    Executed = 7,
}

impl ProposalState {
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => ProposalState::Pending,
            1 => ProposalState::Active,
            2 => ProposalState::Canceled,
            3 => ProposalState::Defeated,
            4 => ProposalState::Succeeded,
            5 => ProposalState::Queued,
            6 => ProposalState::Expired,
            7 => ProposalState::Executed,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProposalState::Pending => "Pending",
            ProposalState::Active => "Active",
            ProposalState::Canceled => "Canceled",
            ProposalState::Defeated => "Defeated",
            ProposalState::Succeeded => "Succeeded",
            ProposalState::Queued => "Queued",
            ProposalState::Expired => "Expired",
            ProposalState::Executed => "Executed",
        }
    }

    /// Executed, Canceled and Defeated never change again.
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            ProposalState::Executed | ProposalState::Canceled | ProposalState::Defeated
        )
    }
}

impl std::str::FromStr for ProposalState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Ok(code) = s.parse::<u8>() {
            return ProposalState::from_code(code).ok_or_else(|| format!("unknown state code {}", code));
        }
        (0u8..=7)
            .filter_map(ProposalState::from_code)
            .find(|state| state.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown state '{}'", s))
    }
}

/// Ballot options. Discriminants are the wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VoteSupport {
    Against = 0,
    For = 1,
    /// Counts toward quorum only
    Abstain = 2,
}

impl TryFrom<u8> for VoteSupport {
    type Error = GovernanceError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(VoteSupport::Against),
            1 => Ok(VoteSupport::For),
            2 => Ok(VoteSupport::Abstain),
            other => Err(GovernanceError::InvalidSupport(other)),
        }
    }
}

/// A voter's recorded ballot. Weight is frozen at cast time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ballot {
    pub support: VoteSupport,
    pub weight: u128,
}

/// Hash a proposal description.
pub fn hash_description(description: &str) -> Hash {
    Hash::compute(description.as_bytes())
}

/// Deterministic proposal id.
///
/// `blake3(PROPOSAL_DOMAIN || borsh(targets, values, calldatas, description_hash))`
pub fn hash_proposal(
    targets: &[Address],
    values: &[u128],
    calldatas: &[Vec<u8>],
    description_hash: &Hash,
) -> Result<Hash> {
    hash_tagged(PROPOSAL_DOMAIN, &(targets, values, calldatas, description_hash))
}

pub(crate) fn hash_tagged<T: BorshSerialize>(domain: &[u8], value: &T) -> Result<Hash> {
    let encoded = borsh::to_vec(value)
        .map_err(|e| GovernanceError::InvalidProposal(format!("encoding failed: {}", e)))?;
    Ok(Hash::compute_multi(&[domain, encoded.as_slice()]))
}

/// Reject empty or ragged action arrays.
pub fn validate_actions(targets: &[Address], values: &[u128], calldatas: &[Vec<u8>]) -> Result<()> {
    if targets.is_empty() {
        return Err(GovernanceError::InvalidProposal("empty proposal".to_string()));
    }
    if targets.len() != values.len() || targets.len() != calldatas.len() {
        return Err(GovernanceError::InvalidProposal(format!(
            "invalid proposal length: {} targets, {} values, {} calldatas",
            targets.len(),
            values.len(),
            calldatas.len()
        )));
    }
    Ok(())
}

/// On-chain proposal record.
///
/// State is never stored; the engine derives it from these fields and the
/// current block.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub id: Hash,
    pub proposer: Address,
    pub targets: Vec<Address>,
    pub values: Vec<u128>,
    pub calldatas: Vec<Vec<u8>>,
    pub description: String,
    pub description_hash: Hash,
    /// Block the proposal was submitted in
    pub created_block: BlockNumber,
    /// Block whose weights count
    pub snapshot_block: BlockNumber,
    /// Voting opens after this block
    pub vote_start: BlockNumber,
    /// Voting closes after this block
    pub vote_end: BlockNumber,
    pub for_votes: u128,
    pub against_votes: u128,
    pub abstain_votes: u128,
    pub ballots: HashMap<Address, Ballot>,
    /// Timelock operation once queued
    pub timelock_id: Option<Hash>,
    /// Earliest execution time once queued
    pub eta: Option<Timestamp>,
    /// Actions that took effect during an execution that later reverted
    pub applied: usize,
    pub executed: bool,
    pub canceled: bool,
}

impl Proposal {
    pub fn has_voted(&self, voter: &Address) -> bool {
        self.ballots.contains_key(voter)
    }

    /// Add a ballot to the tallies.
    pub(crate) fn record_ballot(&mut self, voter: Address, ballot: Ballot) {
        match ballot.support {
            VoteSupport::Against => self.against_votes = self.against_votes.saturating_add(ballot.weight),
            VoteSupport::For => self.for_votes = self.for_votes.saturating_add(ballot.weight),
            VoteSupport::Abstain => self.abstain_votes = self.abstain_votes.saturating_add(ballot.weight),
        }
        self.ballots.insert(voter, ballot);
    }

    /// Against, for and abstain tallies, in wire order.
    pub fn votes(&self) -> (u128, u128, u128) {
        (self.against_votes, self.for_votes, self.abstain_votes)
    }

    pub fn total_votes(&self) -> u128 {
        self.for_votes
            .saturating_add(self.against_votes)
            .saturating_add(self.abstain_votes)
    }

    pub fn quorum_reached(&self, quorum: u128) -> bool {
        self.total_votes() >= quorum
    }

    pub fn vote_succeeded(&self) -> bool {
        self.for_votes > self.against_votes
    }
}
