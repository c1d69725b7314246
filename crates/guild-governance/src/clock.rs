//! Domain time: block height plus a wall-clock timestamp.
//!
//! Nothing advances on its own. Voting windows compare against `block`,
//! timelock readiness against `timestamp`, both evaluated when read.

use guild_types::{BlockNumber, Timestamp};

/// Default seconds per mined block.
pub const DEFAULT_BLOCK_TIME: u64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainClock {
    block: BlockNumber,
    timestamp: Timestamp,
    block_time: u64,
}

impl ChainClock {
    pub fn new(block_time: u64) -> Self {
        Self {
            block: 0,
            timestamp: 0,
            block_time,
        }
    }

    /// Start from an arbitrary height and timestamp.
    pub fn at(block: BlockNumber, timestamp: Timestamp, block_time: u64) -> Self {
        Self {
            block,
            timestamp,
            block_time,
        }
    }

    pub fn block(&self) -> BlockNumber {
        self.block
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn block_time(&self) -> u64 {
        self.block_time
    }

    /// Mine `blocks` empty blocks.
    pub fn mine(&mut self, blocks: u64) {
        self.block = self.block.saturating_add(blocks);
        self.timestamp = self
            .timestamp
            .saturating_add(blocks.saturating_mul(self.block_time));
    }

    /// Move the timestamp forward without producing blocks.
    pub fn advance_time(&mut self, seconds: u64) {
        self.timestamp = self.timestamp.saturating_add(seconds);
    }
}

impl Default for ChainClock {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_TIME)
    }
}
