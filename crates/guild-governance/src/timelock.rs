//! Timelock gate.
//!
//! Holds approved action bundles for at least `min_delay` seconds before
//! they may run, and lets each run exactly once. Only the principal bound
//! at setup (the governor) may schedule or execute.

use std::collections::HashMap;

use guild_types::{Address, Hash, Timestamp};
use tracing::debug;

use crate::access::{Authorizer, Role, RoleRegistry};
use crate::error::{GovernanceError, Result};
use crate::proposal::hash_tagged;

/// Domain tag mixed into every operation id.
pub const OPERATION_DOMAIN: &[u8] = b"guild.timelock.operation.v1";

/// Deterministic operation id.
pub fn hash_operation(
    targets: &[Address],
    values: &[u128],
    calldatas: &[Vec<u8>],
    predecessor: &Hash,
    salt: &Hash,
) -> Result<Hash> {
    hash_tagged(OPERATION_DOMAIN, &(targets, values, calldatas, predecessor, salt))
}

/// A scheduled operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimelockOperation {
    pub id: Hash,
    pub ready_at: Timestamp,
    pub executed: bool,
}

#[derive(Debug)]
pub struct Timelock {
    address: Address,
    min_delay: u64,
    roles: RoleRegistry,
    bound: Option<Address>,
    operations: HashMap<Hash, TimelockOperation>,
}

impl Timelock {
    pub fn new(address: Address, min_delay: u64, roles: RoleRegistry) -> Self {
        Self {
            address,
            min_delay,
            roles,
            bound: None,
            operations: HashMap::new(),
        }
    }

    /// Address the timelock acts as when it dispatches actions.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn min_delay(&self) -> u64 {
        self.min_delay
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn roles_mut(&mut self) -> &mut RoleRegistry {
        &mut self.roles
    }

    /// Bind `principal` as the only scheduler/executor.
    ///
    /// `principal` must hold both [`Role::Proposer`] and [`Role::Executor`]
    /// now; later role changes do not affect a bound gate.
    pub fn bind(&mut self, principal: Address) -> Result<()> {
        self.roles.require_role(Role::Proposer, &principal)?;
        self.roles.require_role(Role::Executor, &principal)?;
        self.bound = Some(principal);
        debug!(timelock = %self.address, principal = %principal, "timelock bound");
        Ok(())
    }

    pub fn bound(&self) -> Option<Address> {
        self.bound
    }

    fn authorize(&self, caller: &Address) -> Result<()> {
        match self.bound {
            Some(bound) if bound == *caller => Ok(()),
            _ => Err(GovernanceError::Unauthorized(format!(
                "{} is not the bound timelock principal",
                caller
            ))),
        }
    }

    /// Schedule `id` to become ready `delay` seconds after `now`.
    pub fn schedule(&mut self, caller: Address, id: Hash, delay: u64, now: Timestamp) -> Result<Timestamp> {
        self.authorize(&caller)?;

        if delay < self.min_delay {
            return Err(GovernanceError::InsufficientDelay {
                delay,
                min_delay: self.min_delay,
            });
        }

        if self.operations.contains_key(&id) {
            return Err(GovernanceError::AlreadyScheduled(id));
        }

        let ready_at = now.saturating_add(delay);
        self.operations.insert(id, TimelockOperation { id, ready_at, executed: false });

        debug!(operation = %id.short(), ready_at, "operation scheduled");
        Ok(ready_at)
    }

    pub fn operation(&self, id: &Hash) -> Option<&TimelockOperation> {
        self.operations.get(id)
    }

    /// Ready time of `id`, if scheduled.
    pub fn timestamp(&self, id: &Hash) -> Option<Timestamp> {
        self.operations.get(id).map(|op| op.ready_at)
    }

    /// Scheduled and not yet executed.
    pub fn is_pending(&self, id: &Hash) -> bool {
        self.operations.get(id).map(|op| !op.executed).unwrap_or(false)
    }

    /// Pending and past its ready time.
    pub fn is_ready(&self, id: &Hash, now: Timestamp) -> bool {
        self.operations
            .get(id)
            .map(|op| !op.executed && now >= op.ready_at)
            .unwrap_or(false)
    }

    pub fn is_done(&self, id: &Hash) -> bool {
        self.operations.get(id).map(|op| op.executed).unwrap_or(false)
    }

    /// Record that `id` ran. Fails on a second call.
    pub fn mark_executed(&mut self, caller: Address, id: Hash, now: Timestamp) -> Result<()> {
        self.authorize(&caller)?;

        let op = self
            .operations
            .get_mut(&id)
            .ok_or(GovernanceError::UnknownOperation(id))?;

        if op.executed {
            return Err(GovernanceError::AlreadyExecuted);
        }
        if now < op.ready_at {
            return Err(GovernanceError::NotReady(id));
        }

        op.executed = true;
        debug!(operation = %id.short(), "operation executed");
        Ok(())
    }

    /// Drop a pending operation. Caller must hold [`Role::Canceller`].
    pub fn cancel(&mut self, caller: Address, id: Hash) -> Result<()> {
        self.roles.require_role(Role::Canceller, &caller)?;

        match self.operations.get(&id) {
            None => return Err(GovernanceError::UnknownOperation(id)),
            Some(op) if op.executed => return Err(GovernanceError::AlreadyExecuted),
            Some(_) => {}
        }

        self.operations.remove(&id);
        debug!(operation = %id.short(), canceller = %caller, "operation canceled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from_bytes(bytes)
    }

    fn bound_timelock(min_delay: u64) -> (Timelock, Address) {
        let admin = addr(1);
        let governor = addr(2);
        let mut roles = RoleRegistry::new(admin);
        roles.grant_role(admin, Role::Proposer, governor).unwrap();
        roles.grant_role(admin, Role::Executor, governor).unwrap();
        roles.grant_role(admin, Role::Canceller, admin).unwrap();

        let mut timelock = Timelock::new(addr(3), min_delay, roles);
        timelock.bind(governor).unwrap();
        (timelock, governor)
    }

    #[test]
    fn test_bind_requires_both_roles() {
        let admin = addr(1);
        let mut roles = RoleRegistry::new(admin);
        roles.grant_role(admin, Role::Proposer, addr(2)).unwrap();

        let mut timelock = Timelock::new(addr(3), 0, roles);
        assert!(matches!(timelock.bind(addr(2)), Err(GovernanceError::Unauthorized(_))));
        assert_eq!(timelock.bound(), None);
    }

    #[test]
    fn test_schedule_and_execute_once() {
        let (mut timelock, governor) = bound_timelock(60);
        let id = Hash::compute(b"op");

        let ready = timelock.schedule(governor, id, 60, 1_000).unwrap();
        assert_eq!(ready, 1_060);
        assert!(timelock.is_pending(&id));
        assert!(!timelock.is_ready(&id, 1_059));

        assert_eq!(timelock.mark_executed(governor, id, 1_059), Err(GovernanceError::NotReady(id)));
        assert!(timelock.is_ready(&id, 1_060));
        timelock.mark_executed(governor, id, 1_060).unwrap();
        assert!(timelock.is_done(&id));
        assert!(!timelock.is_ready(&id, 2_000));

        assert_eq!(timelock.mark_executed(governor, id, 2_000), Err(GovernanceError::AlreadyExecuted));
    }

    #[test]
    fn test_schedule_twice_rejected() {
        let (mut timelock, governor) = bound_timelock(0);
        let id = Hash::compute(b"op");
        timelock.schedule(governor, id, 0, 0).unwrap();
        assert_eq!(
            timelock.schedule(governor, id, 0, 10),
            Err(GovernanceError::AlreadyScheduled(id))
        );
        assert_eq!(timelock.timestamp(&id), Some(0));
    }

    #[test]
    fn test_delay_below_minimum() {
        let (mut timelock, governor) = bound_timelock(100);
        let result = timelock.schedule(governor, Hash::compute(b"op"), 99, 0);
        assert!(matches!(result, Err(GovernanceError::InsufficientDelay { .. })));
    }

    #[test]
    fn test_only_bound_principal_may_schedule() {
        let (mut timelock, _) = bound_timelock(0);
        let result = timelock.schedule(addr(9), Hash::compute(b"op"), 0, 0);
        assert!(matches!(result, Err(GovernanceError::Unauthorized(_))));
    }

    #[test]
    fn test_cancel_pending() {
        let (mut timelock, governor) = bound_timelock(0);
        let id = Hash::compute(b"op");
        timelock.schedule(governor, id, 0, 0).unwrap();

        assert!(timelock.cancel(governor, id).is_err());
        timelock.cancel(addr(1), id).unwrap();
        assert!(!timelock.is_pending(&id));
        assert_eq!(timelock.cancel(addr(1), id), Err(GovernanceError::UnknownOperation(id)));
    }

    #[test]
    fn test_operation_id_depends_on_salt() {
        let target = [addr(7)];
        let a = hash_operation(&target, &[0], &[vec![1]], &Hash::ZERO, &Hash::compute(b"a")).unwrap();
        let b = hash_operation(&target, &[0], &[vec![1]], &Hash::ZERO, &Hash::compute(b"b")).unwrap();
        assert_ne!(a, b);
    }
}
