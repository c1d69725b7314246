//! Role-based capability checks.
//!
//! Components never inherit permissions; each one is handed a registry (or
//! any other [`Authorizer`]) at construction and asks it `(role, principal)`.

use std::collections::{HashMap, HashSet};

use guild_types::Address;
use tracing::debug;

use crate::error::{GovernanceError, Result};

/// Capabilities understood by guild components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// May grant and revoke every role
    Admin,
    /// May mint weight-bearing tokens or diplomas
    Minter,
    /// May pause the diploma contract
    Pauser,
    /// May schedule timelock operations
    Proposer,
    /// May execute timelock operations
    Executor,
    /// May cancel proposals and timelock operations
    Canceller,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN_ROLE",
            Role::Minter => "MINTER_ROLE",
            Role::Pauser => "PAUSER_ROLE",
            Role::Proposer => "PROPOSER_ROLE",
            Role::Executor => "EXECUTOR_ROLE",
            Role::Canceller => "CANCELLER_ROLE",
        }
    }
}

/// Answers "does `account` hold `role`?".
pub trait Authorizer {
    fn has_role(&self, role: Role, account: &Address) -> bool;

    /// Fail with `Unauthorized` unless `account` holds `role`.
    fn require_role(&self, role: Role, account: &Address) -> Result<()> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(GovernanceError::Unauthorized(format!(
                "{} is missing {}",
                account,
                role.name()
            )))
        }
    }
}

/// In-memory role registry.
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    members: HashMap<Role, HashSet<Address>>,
}

impl RoleRegistry {
    /// Create a registry whose only member is `admin` holding [`Role::Admin`].
    pub fn new(admin: Address) -> Self {
        let mut registry = Self::default();
        registry.members.entry(Role::Admin).or_default().insert(admin);
        registry
    }

    /// Grant `role` to `account`. Caller must hold `Admin`.
    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.require_role(Role::Admin, &caller)?;
        if self.members.entry(role).or_default().insert(account) {
            debug!(role = role.name(), account = %account, "role granted");
        }
        Ok(())
    }

    /// Revoke `role` from `account`. Caller must hold `Admin`.
    pub fn revoke_role(&mut self, caller: Address, role: Role, account: Address) -> Result<()> {
        self.require_role(Role::Admin, &caller)?;
        if let Some(set) = self.members.get_mut(&role) {
            if set.remove(&account) {
                debug!(role = role.name(), account = %account, "role revoked");
            }
        }
        Ok(())
    }

    /// Drop a role the caller holds.
    pub fn renounce_role(&mut self, caller: Address, role: Role) {
        if let Some(set) = self.members.get_mut(&role) {
            set.remove(&caller);
        }
    }

    /// Members of `role`, sorted.
    pub fn members(&self, role: Role) -> Vec<Address> {
        let mut out: Vec<Address> = self
            .members
            .get(&role)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        out.sort();
        out
    }
}

impl Authorizer for RoleRegistry {
    fn has_role(&self, role: Role, account: &Address) -> bool {
        self.members
            .get(&role)
            .map(|s| s.contains(account))
            .unwrap_or(false)
    }
}
