//! Guild Contracts - Collaborators governed by the Diploma Guild.
//!
//! - Marking token: the fungible balances voting weight is derived from
//! - Diploma NFT: the contract approved proposals mint into
//! - Guild: deployment wiring for the whole set

pub mod calldata;
pub mod diploma_nft;
pub mod guild;
pub mod marking_token;

pub use calldata::{CallError, DiplomaCall};
pub use diploma_nft::{DiplomaNft, NftError, TokenId};
pub use guild::{Guild, GuildAddresses, ProjectActions};
pub use marking_token::{MarkingToken, TokenError, ONE_TOKEN};
