//! Governor settings.
//!
//! Loaded from the `[governor]` table of a guild config file.

use serde::{Deserialize, Serialize};

use crate::clock::DEFAULT_BLOCK_TIME;
use crate::error::{GovernanceError, Result};

/// How the quorum for a proposal is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuorumRule {
    /// Fixed number of weight units
    Fixed(#[serde(with = "weight")] u128),
    /// Fraction of the total supply at the proposal's snapshot block
    Fraction { numerator: u64, denominator: u64 },
}

impl QuorumRule {
    /// Quorum for a snapshot whose total supply was `past_total_supply`.
    pub fn quorum(&self, past_total_supply: u128) -> u128 {
        match *self {
            QuorumRule::Fixed(amount) => amount,
            QuorumRule::Fraction { numerator, denominator } => {
                if denominator == 0 {
                    return 0;
                }
                past_total_supply.saturating_mul(numerator as u128) / denominator as u128
            }
        }
    }
}

/// TOML integers stop at `i64::MAX`; larger weights travel as decimal strings.
mod weight {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(u64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        match i64::try_from(*amount) {
            Ok(small) => serializer.serialize_i64(small),
            Err(_) => serializer.serialize_str(&amount.to_string()),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Int(amount) => Ok(amount as u128),
            Repr::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Governor settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorSettings {
    /// Blocks between proposal creation and the start of voting
    pub voting_delay: u64,
    /// Blocks the vote stays open
    pub voting_period: u64,
    /// Minimum past votes needed to propose
    pub proposal_threshold: u64,
    /// Seconds between queueing and execution
    pub timelock_min_delay: u64,
    /// Seconds per mined block
    pub block_time: u64,
    /// Quorum rule (kept last: it serializes as a TOML table)
    pub quorum: QuorumRule,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            voting_delay: 0,
            voting_period: 5,
            proposal_threshold: 0,
            timelock_min_delay: 0,
            block_time: DEFAULT_BLOCK_TIME,
            quorum: QuorumRule::Fixed(1),
        }
    }
}

impl GovernorSettings {
    /// Parse settings from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let settings: GovernorSettings =
            toml::from_str(s).map_err(|e| GovernanceError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.voting_period == 0 {
            return Err(GovernanceError::Config("voting_period cannot be 0".into()));
        }

        if let QuorumRule::Fraction { numerator, denominator } = self.quorum {
            if denominator == 0 {
                return Err(GovernanceError::Config("quorum denominator cannot be 0".into()));
            }
            if numerator > denominator {
                return Err(GovernanceError::Config(format!(
                    "quorum fraction {}/{} exceeds 1",
                    numerator, denominator
                )));
            }
        }

        Ok(())
    }
}
