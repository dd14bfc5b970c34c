//! Node configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use hashgraph_consensus::ConsensusConfig;
use hashgraph_core::{PeerId, PeerSet};
use hashgraph_sync::SyncConfig;

use crate::error::{NodeError, Result};

/// Default number of buffered transactions before submissions are refused.
pub const DEFAULT_MAX_PENDING_TRANSACTIONS: usize = 10_000;

/// Configuration for a [`Node`](crate::Node).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's identity.
    pub peer_id: PeerId,
    /// Full membership, including this node.
    pub peers: Vec<PeerId>,
    /// Consensus parameters.
    #[serde(default)]
    pub consensus: ConsensusConfig,
    /// Sync parameters.
    #[serde(default)]
    pub sync: SyncConfig,
    /// Pause between gossip passes in [`Node::run`](crate::Node::run).
    #[serde(with = "hashgraph_sync::serde_millis", default = "default_gossip_interval")]
    pub gossip_interval: Duration,
    /// Bound on transactions waiting for the next local event.
    #[serde(default = "default_max_pending_transactions")]
    pub max_pending_transactions: usize,
}

fn default_gossip_interval() -> Duration {
    Duration::from_millis(200)
}

fn default_max_pending_transactions() -> usize {
    DEFAULT_MAX_PENDING_TRANSACTIONS
}

impl NodeConfig {
    /// Configuration with defaults for everything but membership.
    pub fn new(peer_id: PeerId, peers: Vec<PeerId>) -> Self {
        Self {
            peer_id,
            peers,
            consensus: ConsensusConfig::default(),
            sync: SyncConfig::default(),
            gossip_interval: default_gossip_interval(),
            max_pending_transactions: DEFAULT_MAX_PENDING_TRANSACTIONS,
        }
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the configuration for values the node cannot run with.
    pub fn validate(&self) -> Result<()> {
        let peers = self.peer_set()?;
        if peers.len() != self.peers.len() {
            return Err(NodeError::InvalidConfig("duplicate peer in membership".into()));
        }
        if !peers.contains(&self.peer_id) {
            return Err(NodeError::InvalidConfig(format!(
                "local peer {} is not in the peer set",
                self.peer_id
            )));
        }
        self.consensus.validate()?;
        self.sync.validate()?;
        if self.gossip_interval.is_zero() {
            return Err(NodeError::InvalidConfig("gossip_interval must be non-zero".into()));
        }
        if self.max_pending_transactions == 0 {
            return Err(NodeError::InvalidConfig(
                "max_pending_transactions must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Membership as a peer set.
    pub fn peer_set(&self) -> Result<PeerSet> {
        Ok(PeerSet::new(self.peers.iter().copied())?)
    }

    /// Every peer but this one, in configuration order.
    pub fn remote_peers(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.iter().filter(move |p| **p != self.peer_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashgraph_core::CoreError;
    use hashgraph_sync::SyncError;

    fn peer(b: u8) -> PeerId {
        PeerId::from_bytes([b; 32])
    }

    #[test]
    fn test_default_config_valid() {
        let config = NodeConfig::new(peer(1), vec![peer(1), peer(2)]);
        assert!(config.validate().is_ok());
        assert_eq!(config.remote_peers().copied().collect::<Vec<_>>(), vec![peer(2)]);
    }

    #[test]
    fn test_rejects_empty_membership() {
        let config = NodeConfig::new(peer(1), vec![]);
        assert!(matches!(
            config.validate(),
            Err(NodeError::Core(CoreError::EmptyPeerSet))
        ));
    }

    #[test]
    fn test_rejects_outsider() {
        let config = NodeConfig::new(peer(9), vec![peer(1), peer(2)]);
        assert!(matches!(config.validate(), Err(NodeError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_duplicates() {
        let config = NodeConfig::new(peer(1), vec![peer(1), peer(1), peer(2)]);
        assert!(matches!(config.validate(), Err(NodeError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_coin_interval_one() {
        let mut config = NodeConfig::new(peer(1), vec![peer(1)]);
        config.consensus.coin_round_interval = 1;
        assert!(matches!(
            config.validate(),
            Err(NodeError::Core(CoreError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_rejects_bad_sync_config() {
        let mut config = NodeConfig::new(peer(1), vec![peer(1)]);
        config.sync.max_events_per_message = 0;
        assert!(matches!(
            config.validate(),
            Err(NodeError::Sync(SyncError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_json_defaults_and_roundtrip() {
        let json = serde_json::json!({
            "peer_id": peer(1),
            "peers": [peer(1), peer(2), peer(3)],
            "gossip_interval": 50,
        })
        .to_string();

        let config = NodeConfig::from_json(&json).unwrap();
        assert_eq!(config.gossip_interval, Duration::from_millis(50));
        assert_eq!(config.consensus, ConsensusConfig::default());
        assert_eq!(config.max_pending_transactions, DEFAULT_MAX_PENDING_TRANSACTIONS);

        let again = NodeConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_json_parse_error() {
        assert!(matches!(
            NodeConfig::from_json("{not json"),
            Err(NodeError::ConfigParse(_))
        ));
    }
}
