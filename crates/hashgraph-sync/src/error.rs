//! Error types for the sync module.

use std::time::Duration;

use thiserror::Error;

use hashgraph_consensus::ConsensusError;
use hashgraph_core::PeerId;

use crate::messages::SyncErrorCode;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Message validation failed.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The peer answered with a message of the wrong kind.
    #[error("unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    /// Encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Peer is not reachable.
    #[error("peer not connected: {0}")]
    PeerNotConnected(PeerId),

    /// Timeout waiting for peer.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Peer sent an error message.
    #[error("peer error ({code:?}): {message}")]
    PeerError { code: SyncErrorCode, message: String },

    /// Sync configuration cannot be used.
    #[error("invalid sync configuration: {0}")]
    InvalidConfig(String),

    /// Local graph rejected an operation.
    #[error("consensus error: {0}")]
    Consensus(#[from] ConsensusError),
}

impl SyncError {
    /// Whether the failure lies with reaching the peer rather than with the
    /// local graph. Such failures skip the peer for this gossip pass.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SyncError::TransportError(_)
                | SyncError::PeerNotConnected(_)
                | SyncError::Timeout(_)
                | SyncError::Codec(_)
        )
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
