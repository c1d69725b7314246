use guild_types::{Address, BlockNumber, Hash};
use thiserror::Error;

use crate::proposal::ProposalState;

/// Errors that can occur in governance operations.
///
/// Every failure leaves ledger, engine and timelock state untouched, except
/// [`GovernanceError::ActionReverted`]: actions dispatched before the failing
/// one keep their effects and are skipped when execution is retried.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Unknown proposal: {0}")]
    UnknownProposal(Hash),

    #[error("Duplicate proposal: {0}")]
    DuplicateProposal(Hash),

    #[error("Already voted: {voter} on {proposal_id}")]
    DuplicateVote { proposal_id: Hash, voter: Address },

    #[error("Voting closed: proposal is {0:?}")]
    VotingClosed(ProposalState),

    #[error("Invalid vote support value: {0}")]
    InvalidSupport(u8),

    #[error("Operation not ready: {0}")]
    NotReady(Hash),

    #[error("Already executed")]
    AlreadyExecuted,

    #[error("Operation already scheduled: {0}")]
    AlreadyScheduled(Hash),

    #[error("No succeeded proposal matches id {0}")]
    IdMismatch(Hash),

    #[error("Action {index} reverted: {reason}")]
    ActionReverted { index: usize, reason: String },

    #[error("Block {requested} not yet mined (current {current})")]
    InvalidBlock { requested: BlockNumber, current: BlockNumber },

    #[error("Invalid proposal: {0}")]
    InvalidProposal(String),

    #[error("Unexpected proposal state: expected {expected:?}, got {actual:?}")]
    UnexpectedState { expected: ProposalState, actual: ProposalState },

    #[error("Proposer votes below threshold: {votes} < {threshold}")]
    BelowProposalThreshold { votes: u128, threshold: u128 },

    #[error("Timelock delay {delay}s below minimum {min_delay}s")]
    InsufficientDelay { delay: u64, min_delay: u64 },

    #[error("Unknown timelock operation: {0}")]
    UnknownOperation(Hash),

    #[error("No action target registered at {0}")]
    UnknownTarget(Address),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Balance ledger error: {0}")]
    Balance(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, GovernanceError>;
