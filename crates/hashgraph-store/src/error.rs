//! Error types for the store module.

use thiserror::Error;

use hashgraph_core::{EventId, PeerId};

/// Errors that can occur during store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A declared parent is not in the store.
    #[error("event {event} names unknown parent {parent}")]
    InvalidParent { event: EventId, parent: EventId },

    /// An event with this id is already stored.
    #[error("duplicate event {0}")]
    DuplicateId(EventId),

    /// Event not found.
    #[error("event not found: {0}")]
    NotFound(EventId),

    /// The peer has no events yet.
    #[error("peer {0} has no events")]
    UnknownPeer(PeerId),

    /// The self-parent belongs to a different peer.
    #[error("event {event} names self-parent {self_parent} owned by another peer")]
    SelfParentOwner { event: EventId, self_parent: EventId },

    /// A derived field already holds a different final value.
    #[error("{field} of event {id} is already decided")]
    AlreadyDecided { id: EventId, field: &'static str },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
