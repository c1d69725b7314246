//! Encoded calls the diploma contract accepts from governance.

use borsh::{BorshDeserialize, BorshSerialize};
use guild_types::Address;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallError {
    #[error("Failed to encode call: {0}")]
    Encode(String),

    #[error("Malformed calldata: {0}")]
    Decode(String),
}

/// Calls a proposal may carry for [`crate::DiplomaNft`].
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum DiplomaCall {
    /// Mint the next diploma to `to` with metadata at `uri`
    SafeMint { to: Address, uri: String },
    Pause,
    Unpause,
}

impl DiplomaCall {
    pub fn safe_mint(to: Address, uri: impl Into<String>) -> Self {
        DiplomaCall::SafeMint { to, uri: uri.into() }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CallError> {
        borsh::to_vec(self).map_err(|e| CallError::Encode(e.to_string()))
    }

    /// Decode calldata. Trailing bytes are rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self, CallError> {
        borsh::from_slice(bytes).map_err(|e| CallError::Decode(e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            DiplomaCall::SafeMint { .. } => "safe_mint",
            DiplomaCall::Pause => "pause",
            DiplomaCall::Unpause => "unpause",
        }
    }
}
