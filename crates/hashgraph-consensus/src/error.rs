//! Error types for the consensus engine.

use thiserror::Error;

use hashgraph_core::{CoreError, ValidationError};
use hashgraph_store::StoreError;

/// Errors that can occur while growing the graph or deriving consensus.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// Event failed structural validation.
    #[error("invalid event: {0}")]
    Validation(#[from] ValidationError),

    /// Store rejected the event or a lookup failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Peer set or configuration problem.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ConsensusError {
    /// Whether this rejection may resolve itself once more events arrive.
    ///
    /// True only for missing parents: the sender will re-deliver them on a
    /// later sync.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConsensusError::Store(StoreError::InvalidParent { .. }))
    }
}

/// Result type for consensus operations.
pub type Result<T> = std::result::Result<T, ConsensusError>;
