//! Error types for the hashgraph core.

use thiserror::Error;

use crate::types::{EventId, PeerId};

/// Core errors outside of event validation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("peer set must contain at least one peer")]
    EmptyPeerSet,

    #[error("peer {0} is not a member of the peer set")]
    NotAMember(PeerId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structural validation errors for incoming events.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("event id mismatch: claimed {claimed}, computed {computed}")]
    IdMismatch { claimed: EventId, computed: EventId },

    #[error("event {0} names exactly one parent; both or neither are required")]
    PartialParents(EventId),

    #[error("event {0} uses the same event as self-parent and other-parent")]
    SameParents(EventId),

    #[error("event {event} owned by unknown peer {owner}")]
    UnknownOwner { event: EventId, owner: PeerId },

    #[error("event {event} carries {count} transactions (max {max})")]
    TooManyTransactions {
        event: EventId,
        count: usize,
        max: usize,
    },
}
