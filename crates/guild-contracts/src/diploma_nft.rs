//! Diploma NFT
//!
//! One token per graduating project. Minting and pausing are role-gated;
//! in a deployed guild the timelock holds both roles, so diplomas only
//! appear through an executed proposal.

use std::collections::HashMap;

use guild_governance::{ActionTarget, Authorizer, GovernanceError, Role, RoleRegistry};
use guild_types::Address;
use thiserror::Error;
use tracing::info;

use crate::calldata::{CallError, DiplomaCall};

pub const NFT_NAME: &str = "Diploma Guild";
pub const NFT_SYMBOL: &str = "DPL";

pub type TokenId = u64;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NftError {
    #[error(transparent)]
    Access(#[from] GovernanceError),

    #[error("Contract is paused")]
    ContractPaused,

    #[error("Contract is not paused")]
    NotPaused,

    #[error("Cannot mint to zero address")]
    MintToZero,

    #[error("Token not minted: {0}")]
    NotMinted(TokenId),

    #[error(transparent)]
    Call(#[from] CallError),
}

#[derive(Debug)]
pub struct DiplomaNft {
    name: String,
    symbol: String,
    roles: RoleRegistry,
    next_token_id: TokenId,
    owners: HashMap<TokenId, Address>,
    balances: HashMap<Address, u64>,
    token_uris: HashMap<TokenId, String>,
    paused: bool,
}

impl DiplomaNft {
    /// Deploy with `roles`; grant [`Role::Minter`] and [`Role::Pauser`] separately.
    pub fn new(roles: RoleRegistry) -> Self {
        Self {
            name: NFT_NAME.to_string(),
            symbol: NFT_SYMBOL.to_string(),
            roles,
            next_token_id: 0,
            owners: HashMap::new(),
            balances: HashMap::new(),
            token_uris: HashMap::new(),
            paused: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn roles_mut(&mut self) -> &mut RoleRegistry {
        &mut self.roles
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.roles.has_role(role, account)
    }

    /// Mint the next token to `to`. Returns its id.
    pub fn safe_mint(&mut self, caller: Address, to: Address, uri: String) -> Result<TokenId, NftError> {
        self.roles.require_role(Role::Minter, &caller)?;
        if self.paused {
            return Err(NftError::ContractPaused);
        }
        if to.is_zero() {
            return Err(NftError::MintToZero);
        }

        let token_id = self.next_token_id;
        self.next_token_id += 1;
        self.owners.insert(token_id, to);
        *self.balances.entry(to).or_insert(0) += 1;

        info!(token_id, to = %to, uri = %uri, "diploma minted");
        self.token_uris.insert(token_id, uri);
        Ok(token_id)
    }

    pub fn balance_of(&self, owner: &Address) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn owner_of(&self, token_id: TokenId) -> Result<Address, NftError> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or(NftError::NotMinted(token_id))
    }

    pub fn token_uri(&self, token_id: TokenId) -> Result<&str, NftError> {
        self.token_uris
            .get(&token_id)
            .map(String::as_str)
            .ok_or(NftError::NotMinted(token_id))
    }

    pub fn total_minted(&self) -> u64 {
        self.next_token_id
    }

    pub fn pause(&mut self, caller: Address) -> Result<(), NftError> {
        self.roles.require_role(Role::Pauser, &caller)?;
        if self.paused {
            return Err(NftError::ContractPaused);
        }
        self.paused = true;
        Ok(())
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), NftError> {
        self.roles.require_role(Role::Pauser, &caller)?;
        if !self.paused {
            return Err(NftError::NotPaused);
        }
        self.paused = false;
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn dispatch(&mut self, caller: Address, calldata: &[u8]) -> Result<Vec<u8>, NftError> {
        match DiplomaCall::decode(calldata)? {
            DiplomaCall::SafeMint { to, uri } => {
                let token_id = self.safe_mint(caller, to, uri)?;
                Ok(token_id.to_le_bytes().to_vec())
            }
            DiplomaCall::Pause => self.pause(caller).map(|_| Vec::new()),
            DiplomaCall::Unpause => self.unpause(caller).map(|_| Vec::new()),
        }
    }
}

impl ActionTarget for DiplomaNft {
    fn call(&mut self, caller: Address, value: u128, calldata: &[u8]) -> Result<Vec<u8>, String> {
        if value != 0 {
            return Err(format!("diploma contract does not accept value ({})", value));
        }
        self.dispatch(caller, calldata).map_err(|e| e.to_string())
    }
}
