//! Block-indexed value history.

use guild_types::BlockNumber;

/// A recorded `(block, value)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub block: BlockNumber,
    pub value: u128,
}

/// Ordered checkpoints for one account (or for the total supply).
///
/// Blocks are non-decreasing; a second write in the same block replaces
/// that block's checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CheckpointHistory {
    points: Vec<Checkpoint>,
}

impl CheckpointHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of the most recent checkpoint, 0 when empty.
    pub fn latest(&self) -> u128 {
        self.points.last().map(|c| c.value).unwrap_or(0)
    }

    /// Record `value` at `block`.
    pub fn push(&mut self, block: BlockNumber, value: u128) {
        match self.points.last_mut() {
            Some(last) if last.block == block => last.value = value,
            Some(last) if last.block > block => {
                // The clock never goes backwards; treat as a same-block write.
                last.value = value;
            }
            _ => self.points.push(Checkpoint { block, value }),
        }
    }

    /// Value at the latest checkpoint with `checkpoint.block <= block`.
    pub fn upper_lookup(&self, block: BlockNumber) -> u128 {
        let idx = self.points.partition_point(|c| c.block <= block);
        if idx == 0 {
            0
        } else {
            self.points[idx - 1].value
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<Checkpoint> {
        self.points.get(pos).copied()
    }
}
