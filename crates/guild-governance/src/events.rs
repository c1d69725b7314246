//! Governor events.

use guild_types::{Address, BlockNumber, Hash, Timestamp};

use crate::proposal::VoteSupport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GovernorEvent {
    ProposalCreated {
        proposal_id: Hash,
        proposer: Address,
        targets: Vec<Address>,
        values: Vec<u128>,
        calldatas: Vec<Vec<u8>>,
        vote_start: BlockNumber,
        vote_end: BlockNumber,
        description: String,
    },
    VoteCast {
        voter: Address,
        proposal_id: Hash,
        support: VoteSupport,
        weight: u128,
        reason: String,
    },
    ProposalQueued {
        proposal_id: Hash,
        eta: Timestamp,
    },
    ProposalExecuted {
        proposal_id: Hash,
    },
    ProposalCanceled {
        proposal_id: Hash,
    },
}

impl GovernorEvent {
    pub fn proposal_id(&self) -> Hash {
        match self {
            GovernorEvent::ProposalCreated { proposal_id, .. }
            | GovernorEvent::VoteCast { proposal_id, .. }
            | GovernorEvent::ProposalQueued { proposal_id, .. }
            | GovernorEvent::ProposalExecuted { proposal_id }
            | GovernorEvent::ProposalCanceled { proposal_id } => *proposal_id,
        }
    }
}
