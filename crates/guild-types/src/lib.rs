//! Guild Types - Core type definitions shared by the Diploma Guild crates.
//!
//! - Addresses (20-byte, Bech32m encoded)
//! - Hashes (32-byte, blake3 digests)

pub mod address;
pub mod hash;
pub mod error;

#[cfg(any(feature = "serde", feature = "borsh"))]
mod serialization;

pub use address::Address;
pub use hash::Hash;
pub use error::TypesError;

/// Block height on the guild's ledger.
pub type BlockNumber = u64;

/// Seconds since the chain's genesis timestamp.
pub type Timestamp = u64;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, BlockNumber, Hash, Timestamp, TypesError};
}
