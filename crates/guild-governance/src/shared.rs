//! Serialized access to a governor from many callers.
//!
//! Every operation runs under one lock, so transactions are totally
//! ordered and none observes another half-applied.

use std::sync::Arc;

use guild_types::Hash;
use parking_lot::Mutex;

use crate::error::Result;
use crate::governor::Governor;
use crate::ledger::BalanceLedger;
use crate::proposal::ProposalState;

pub struct SharedGovernor<B> {
    inner: Arc<Mutex<Governor<B>>>,
    automine: bool,
}

impl<B> Clone for SharedGovernor<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            automine: self.automine,
        }
    }
}

impl<B: BalanceLedger> SharedGovernor<B> {
    pub fn new(governor: Governor<B>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(governor)),
            automine: false,
        }
    }

    /// Give every successful transaction its own freshly mined block.
    pub fn with_automine(mut self, automine: bool) -> Self {
        self.automine = automine;
        self
    }

    pub fn automine(&self) -> bool {
        self.automine
    }

    /// Run `f` as one transaction.
    ///
    /// With automine on, `f` runs in a new block; a failed transaction
    /// leaves the clock where it was.
    pub fn transact<T>(&self, f: impl FnOnce(&mut Governor<B>) -> Result<T>) -> Result<T> {
        let mut governor = self.inner.lock();
        if !self.automine {
            return f(&mut governor);
        }

        let before = *governor.clock();
        governor.mine(1);
        let out = f(&mut governor);
        if out.is_err() {
            governor.restore_clock(before);
        }
        out
    }

    /// Read under the lock without mining.
    pub fn read<T>(&self, f: impl FnOnce(&Governor<B>) -> T) -> T {
        let governor = self.inner.lock();
        f(&governor)
    }

    pub fn state(&self, proposal_id: &Hash) -> Result<ProposalState> {
        self.read(|g| g.state(proposal_id))
    }

    pub fn mine(&self, blocks: u64) {
        self.inner.lock().mine(blocks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Role, RoleRegistry};
    use crate::executor::ActionExecutor;
    use crate::ledger::tests::{addr, Balances};
    use crate::ledger::VotesLedger;
    use crate::settings::GovernorSettings;
    use crate::timelock::Timelock;
    use guild_types::Address;

    fn shared() -> (SharedGovernor<Balances>, Address) {
        let admin = addr(100);
        let governor_addr = addr(101);

        let mut token_roles = RoleRegistry::new(admin);
        token_roles.grant_role(admin, Role::Minter, admin).unwrap();

        let mut timelock_roles = RoleRegistry::new(admin);
        timelock_roles.grant_role(admin, Role::Proposer, governor_addr).unwrap();
        timelock_roles.grant_role(admin, Role::Executor, governor_addr).unwrap();

        let governor = Governor::new(
            governor_addr,
            GovernorSettings::default(),
            VotesLedger::new(Balances::default(), token_roles),
            Timelock::new(addr(102), 0, timelock_roles),
            ActionExecutor::new(),
            RoleRegistry::new(admin),
        )
        .unwrap();

        (SharedGovernor::new(governor), admin)
    }

    #[test]
    fn test_automine_skips_failed_transactions() {
        let (shared, admin) = shared();
        let shared = shared.with_automine(true);

        shared.transact(|g| g.mint(admin, addr(1), 10)).unwrap();
        assert_eq!(shared.read(|g| g.block_number()), 1);

        let failed = shared.transact(|g| g.transfer(addr(1), addr(2), 1_000));
        assert!(failed.is_err());
        assert_eq!(shared.read(|g| g.block_number()), 1);
    }

    #[test]
    fn test_concurrent_votes_are_serialized() {
        let (shared, admin) = shared();
        let voters: Vec<Address> = (1..=8).map(addr).collect();

        shared
            .transact(|g| {
                for voter in &voters {
                    g.mint(admin, *voter, 5)?;
                    g.delegate(*voter, *voter);
                }
                Ok(())
            })
            .unwrap();
        shared.mine(1);

        let target = addr(50);
        let id = shared
            .transact(|g| g.propose(addr(1), vec![target], vec![0], vec![vec![1]], "parallel"))
            .unwrap();
        shared.mine(1);

        std::thread::scope(|scope| {
            for voter in &voters {
                let shared = shared.clone();
                scope.spawn(move || {
                    shared.transact(|g| g.cast_vote(*voter, id, 1)).unwrap();
                    // A second ballot from the same voter always loses.
                    assert!(shared.transact(|g| g.cast_vote(*voter, id, 0)).is_err());
                });
            }
        });

        let votes = shared.read(|g| g.proposal_votes(&id)).unwrap();
        assert_eq!(votes, (0, 40, 0));
    }
}
