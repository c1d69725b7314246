//! Marking Token
//!
//! Fungible token students receive to mark each other's projects. Holds raw
//! balances only; voting weight is tracked by the governance ledger that
//! wraps it.

use std::collections::HashMap;

use guild_governance::BalanceLedger;
use guild_types::Address;
use thiserror::Error;

pub const TOKEN_NAME: &str = "Marking Token";
pub const TOKEN_SYMBOL: &str = "MKT";
pub const TOKEN_DECIMALS: u8 = 18;

/// One whole token in base units.
pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },

    #[error("Zero address not allowed")]
    ZeroAddress,

    #[error("Total supply overflow")]
    Overflow,
}

#[derive(Debug, Clone)]
pub struct MarkingToken {
    name: String,
    symbol: String,
    decimals: u8,
    total_supply: u128,
    balances: HashMap<Address, u128>,
}

impl MarkingToken {
    pub fn new() -> Self {
        Self {
            name: TOKEN_NAME.to_string(),
            symbol: TOKEN_SYMBOL.to_string(),
            decimals: TOKEN_DECIMALS,
            total_supply: 0,
            balances: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Number of distinct holders with a non-zero balance.
    pub fn holders(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }
}

impl Default for MarkingToken {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceLedger for MarkingToken {
    type Error = TokenError;

    fn mint(&mut self, to: Address, amount: u128) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.total_supply = supply;
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    fn transfer(&mut self, from: Address, to: Address, amount: u128) -> Result<(), TokenError> {
        if to.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        let have = self.balance_of(&from);
        if have < amount {
            return Err(TokenError::InsufficientBalance { have, need: amount });
        }

        self.balances.insert(from, have - amount);
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    fn balance_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> u128 {
        self.total_supply
    }
}
