//! Weighted ballot ledger.
//!
//! Voting weight is not a balance read. Each account owns a checkpoint
//! history of the weight delegated to it, and holding tokens gives no
//! weight at all until the holder delegates (to itself or anyone else).
//!
//! Raw balances live in an external [`BalanceLedger`]; this ledger drives
//! it and keeps the weight histories in step.

use std::collections::HashMap;
use std::fmt::Display;

use guild_types::{Address, BlockNumber};
use tracing::debug;

use crate::access::{Authorizer, Role, RoleRegistry};
use crate::checkpoints::{Checkpoint, CheckpointHistory};
use crate::error::{GovernanceError, Result};

/// Fungible balance ledger the weight is derived from.
pub trait BalanceLedger {
    type Error: Display;

    fn mint(&mut self, to: Address, amount: u128) -> std::result::Result<(), Self::Error>;

    fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: u128,
    ) -> std::result::Result<(), Self::Error>;

    fn balance_of(&self, account: &Address) -> u128;

    fn total_supply(&self) -> u128;
}

/// Checkpointed, delegatable voting weight over a [`BalanceLedger`].
#[derive(Debug)]
pub struct VotesLedger<B> {
    token: B,
    roles: RoleRegistry,
    /// delegator -> delegate
    delegates: HashMap<Address, Address>,
    /// delegate -> weight history
    checkpoints: HashMap<Address, CheckpointHistory>,
    total_supply: CheckpointHistory,
}

impl<B: BalanceLedger> VotesLedger<B> {
    /// Wrap `token`. `roles` decides who may mint.
    pub fn new(token: B, roles: RoleRegistry) -> Self {
        Self {
            token,
            roles,
            delegates: HashMap::new(),
            checkpoints: HashMap::new(),
            total_supply: CheckpointHistory::new(),
        }
    }

    pub fn token(&self) -> &B {
        &self.token
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn roles_mut(&mut self) -> &mut RoleRegistry {
        &mut self.roles
    }

    pub fn balance_of(&self, account: &Address) -> u128 {
        self.token.balance_of(account)
    }

    /// Mint `amount` to `account`. `caller` must hold [`Role::Minter`].
    ///
    /// The minted weight goes to `account`'s current delegate, if any.
    pub fn mint(
        &mut self,
        caller: Address,
        account: Address,
        amount: u128,
        block: BlockNumber,
    ) -> Result<()> {
        self.roles.require_role(Role::Minter, &caller)?;

        let new_supply = self
            .total_supply
            .latest()
            .checked_add(amount)
            .ok_or_else(|| GovernanceError::Balance("total supply overflow".into()))?;

        self.token
            .mint(account, amount)
            .map_err(|e| GovernanceError::Balance(e.to_string()))?;

        self.total_supply.push(block, new_supply);
        let delegate = self.delegates.get(&account).copied();
        self.move_voting_power(None, delegate, amount, block);

        debug!(account = %account, amount, block, "minted voting units");
        Ok(())
    }

    /// Move `amount` tokens and the weight they carry.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: u128,
        block: BlockNumber,
    ) -> Result<()> {
        self.token
            .transfer(from, to, amount)
            .map_err(|e| GovernanceError::Balance(e.to_string()))?;

        let src = self.delegates.get(&from).copied();
        let dst = self.delegates.get(&to).copied();
        self.move_voting_power(src, dst, amount, block);
        Ok(())
    }

    /// Point `delegator`'s whole balance at `delegatee`.
    ///
    /// Self-delegation is how a holder activates its own weight.
    pub fn delegate(&mut self, delegator: Address, delegatee: Address, block: BlockNumber) {
        let previous = self.delegates.insert(delegator, delegatee);
        let balance = self.token.balance_of(&delegator);
        self.move_voting_power(previous, Some(delegatee), balance, block);

        debug!(
            delegator = %delegator,
            from = ?previous,
            to = %delegatee,
            weight = balance,
            "delegate changed"
        );
    }

    /// Current delegate of `account`.
    pub fn delegates(&self, account: &Address) -> Option<Address> {
        self.delegates.get(account).copied()
    }

    /// Current voting weight.
    pub fn get_votes(&self, account: &Address) -> u128 {
        self.checkpoints
            .get(account)
            .map(|h| h.latest())
            .unwrap_or(0)
    }

    /// Weight at the end of `at_block`, which must already be mined.
    pub fn get_past_votes(
        &self,
        account: &Address,
        at_block: BlockNumber,
        current: BlockNumber,
    ) -> Result<u128> {
        check_past(at_block, current)?;
        Ok(self
            .checkpoints
            .get(account)
            .map(|h| h.upper_lookup(at_block))
            .unwrap_or(0))
    }

    /// Total supply at the end of `at_block`, which must already be mined.
    pub fn get_past_total_supply(&self, at_block: BlockNumber, current: BlockNumber) -> Result<u128> {
        check_past(at_block, current)?;
        Ok(self.supply_at(at_block))
    }

    /// Total supply recorded at the end of `block`, mined or not.
    pub(crate) fn supply_at(&self, block: BlockNumber) -> u128 {
        self.total_supply.upper_lookup(block)
    }

    pub fn num_checkpoints(&self, account: &Address) -> usize {
        self.checkpoints.get(account).map(|h| h.len()).unwrap_or(0)
    }

    pub fn checkpoint(&self, account: &Address, pos: usize) -> Option<Checkpoint> {
        self.checkpoints.get(account).and_then(|h| h.get(pos))
    }

    fn move_voting_power(
        &mut self,
        src: Option<Address>,
        dst: Option<Address>,
        amount: u128,
        block: BlockNumber,
    ) {
        if src == dst || amount == 0 {
            return;
        }

        if let Some(src) = src {
            let history = self.checkpoints.entry(src).or_default();
            let value = history.latest().saturating_sub(amount);
            history.push(block, value);
        }

        if let Some(dst) = dst {
            let history = self.checkpoints.entry(dst).or_default();
            let value = history.latest().saturating_add(amount);
            history.push(block, value);
        }
    }
}

fn check_past(at_block: BlockNumber, current: BlockNumber) -> Result<()> {
    if at_block >= current {
        return Err(GovernanceError::InvalidBlock {
            requested: at_block,
            current,
        });
    }
    Ok(())
}
