//! Guild Governance - Token-weighted governance for the Diploma Guild.
//!
//! This crate provides:
//! - Checkpointed, delegatable voting weight
//! - Proposal lifecycle management
//! - Timelock gate for approved action bundles
//! - Action dispatch to registered targets

pub mod access;
pub mod checkpoints;
pub mod clock;
pub mod error;
pub mod events;
pub mod executor;
pub mod governor;
pub mod ledger;
pub mod proposal;
pub mod settings;
pub mod shared;
pub mod timelock;

pub use access::{Authorizer, Role, RoleRegistry};
pub use clock::ChainClock;
pub use error::{GovernanceError, Result};
pub use events::GovernorEvent;
pub use executor::{ActionExecutor, ActionTarget};
pub use governor::Governor;
pub use ledger::{BalanceLedger, VotesLedger};
pub use proposal::{hash_description, hash_proposal, Proposal, ProposalState, VoteSupport};
pub use settings::{GovernorSettings, QuorumRule};
pub use shared::SharedGovernor;
pub use timelock::{hash_operation, Timelock};
