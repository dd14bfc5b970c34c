//! Consensus configuration.

use serde::{Deserialize, Serialize};

use hashgraph_core::CoreError;

/// Tunables of the consensus engine.
///
/// Every peer in a network must use the same values, or their orders will
/// diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Every `coin_round_interval`-th voting round is a coin round.
    pub coin_round_interval: u64,
}

impl ConsensusConfig {
    /// Default coin round interval.
    pub const DEFAULT_COIN_ROUND_INTERVAL: u64 = 10;

    /// Check the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        // d = 1 must never be a coin round.
        if self.coin_round_interval < 2 {
            return Err(CoreError::InvalidConfig(format!(
                "coin_round_interval must be at least 2, got {}",
                self.coin_round_interval
            )));
        }
        Ok(())
    }

    /// Whether voting distance `d` is a coin round.
    pub fn is_coin_round(&self, d: u64) -> bool {
        d % self.coin_round_interval == 0
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            coin_round_interval: Self::DEFAULT_COIN_ROUND_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ConsensusConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_coin_round(2));
        assert!(config.is_coin_round(10));
        assert!(config.is_coin_round(20));
    }

    #[test]
    fn test_small_interval_rejected() {
        for interval in [0, 1] {
            let config = ConsensusConfig {
                coin_round_interval: interval,
            };
            assert!(config.validate().is_err());
        }
    }
}
