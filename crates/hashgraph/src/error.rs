//! Error types for the node.

use hashgraph_consensus::ConsensusError;
use hashgraph_core::{CoreError, PeerId};
use hashgraph_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Consensus error.
    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Core error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Configuration could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The transaction buffer is full.
    #[error("transaction buffer full ({capacity} pending)")]
    TransactionBufferFull { capacity: usize },

    /// Peer is not part of the configured membership.
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    /// A node cannot sync with itself.
    #[error("cannot sync with self")]
    SelfSync,
}

impl NodeError {
    /// Whether the failure is the remote peer's (unreachable, timed out,
    /// or answered badly) rather than our own.
    pub fn is_peer_failure(&self) -> bool {
        matches!(self, NodeError::Sync(e) if !matches!(e, SyncError::Consensus(_)))
    }
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
