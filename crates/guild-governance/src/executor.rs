//! Action executor.
//!
//! Dispatches a proposal's encoded actions to registered targets, in order.
//!
//! Execution is NOT atomic across actions: if action `i` fails, actions
//! `0..i` keep their effects and the error reports index `i`. A later run
//! resumes at `i` through the `start` argument, so an action that already
//! took effect is never dispatched again. Callers that need all-or-nothing
//! behaviour must bundle a single action per proposal.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use guild_types::Address;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{GovernanceError, Result};

/// Something an approved proposal can call.
pub trait ActionTarget {
    /// Run `calldata` on behalf of `caller`, returning the raw result.
    fn call(&mut self, caller: Address, value: u128, calldata: &[u8]) -> std::result::Result<Vec<u8>, String>;
}

/// Shared handles let the owner keep reading collaborator state.
impl<T: ActionTarget> ActionTarget for Arc<Mutex<T>> {
    fn call(&mut self, caller: Address, value: u128, calldata: &[u8]) -> std::result::Result<Vec<u8>, String> {
        self.lock().call(caller, value, calldata)
    }
}

#[derive(Default)]
pub struct ActionExecutor {
    targets: HashMap<Address, Box<dyn ActionTarget + Send>>,
}

impl ActionExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target` at `address`, replacing any previous one.
    pub fn register(&mut self, address: Address, target: impl ActionTarget + Send + 'static) {
        self.targets.insert(address, Box::new(target));
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.targets.contains_key(address)
    }

    /// Run the actions from `start` onwards in order and return each raw
    /// result. Indices in errors are positions in the full bundle.
    ///
    /// Unknown targets are rejected before anything runs.
    pub fn run(
        &mut self,
        caller: Address,
        start: usize,
        targets: &[Address],
        values: &[u128],
        calldatas: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>> {
        if let Some(missing) = targets.iter().find(|t| !self.targets.contains_key(*t)) {
            return Err(GovernanceError::UnknownTarget(*missing));
        }

        let mut results = Vec::with_capacity(targets.len().saturating_sub(start));
        for (index, ((target, value), calldata)) in targets
            .iter()
            .zip(values)
            .zip(calldatas)
            .enumerate()
            .skip(start)
        {
            let handler = self
                .targets
                .get_mut(target)
                .ok_or(GovernanceError::UnknownTarget(*target))?;

            match handler.call(caller, *value, calldata) {
                Ok(output) => {
                    debug!(index, target = %target, value, "action dispatched");
                    results.push(output);
                }
                Err(reason) => {
                    warn!(index, target = %target, %reason, applied = index, "action reverted");
                    return Err(GovernanceError::ActionReverted { index, reason });
                }
            }
        }

        Ok(results)
    }
}

impl fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut addrs: Vec<&Address> = self.targets.keys().collect();
        addrs.sort();
        f.debug_struct("ActionExecutor").field("targets", &addrs).finish()
    }
}
