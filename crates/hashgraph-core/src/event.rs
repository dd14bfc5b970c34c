//! Event: the node type of the hashgraph.
//!
//! An event is created by one peer, names up to two parents, and carries an
//! ordered batch of opaque transactions. The creation fields are immutable
//! and content-addressed. The consensus fields start unset and are filled in
//! exactly once by the local engine.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::canonical::event_id_for;
use crate::types::{EventId, PeerId};

/// Maximum number of transactions a single event may carry.
pub const MAX_TRANSACTIONS_PER_EVENT: usize = 1024;

/// Outcome of virtual voting for a witness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Fame {
    /// Voting has not converged yet (or the event is not a witness).
    #[default]
    Undecided,
    /// Decided famous.
    Famous,
    /// Decided not famous.
    NotFamous,
}

impl Fame {
    /// Whether a final value has been reached.
    pub fn is_decided(self) -> bool {
        !matches!(self, Fame::Undecided)
    }

    /// Map a yes/no vote outcome to a final fame value.
    pub fn from_vote(vote: bool) -> Self {
        if vote {
            Fame::Famous
        } else {
            Fame::NotFamous
        }
    }
}

/// A hashgraph event.
///
/// Wire shape: every field below travels over sync. Only the creation
/// fields (`owner` through `transactions`) are covered by the id; the rest
/// are recomputed by the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Content address of the creation fields.
    pub id: EventId,

    /// The peer that created this event.
    pub owner: PeerId,

    /// The owner's previous event (None iff this is the owner's first event).
    pub self_parent: Option<EventId>,

    /// The latest event of the sync counterpart (None iff first event).
    pub other_parent: Option<EventId>,

    /// Creator-claimed time (Unix milliseconds). Untrusted.
    pub timestamp: i64,

    /// Opaque application payloads, in submission order.
    pub transactions: Vec<Bytes>,

    /// Round number.
    pub round: u64,

    /// Whether this is the owner's first event of its round.
    pub is_witness: bool,

    /// Fame (meaningful only for witnesses).
    pub fame: Fame,

    /// Round in which the event reached consensus.
    pub round_received: Option<u64>,

    /// Synthetic consensus time (median of famous witnesses' first sightings).
    pub consensus_timestamp: Option<i64>,
}

impl Event {
    /// Recompute the content address from the creation fields.
    pub fn compute_id(&self) -> EventId {
        event_id_for(
            &self.owner,
            self.self_parent.as_ref(),
            self.other_parent.as_ref(),
            self.timestamp,
            &self.transactions,
        )
    }

    /// Whether this is the owner's first event (no parents at all).
    pub fn is_first(&self) -> bool {
        self.self_parent.is_none() && self.other_parent.is_none()
    }

    /// Whether the event has been placed in the total order.
    pub fn is_ordered(&self) -> bool {
        self.round_received.is_some()
    }

    /// Clear every derived consensus field.
    ///
    /// Used when an event arrives from the network: remote values are not
    /// trusted and are recomputed locally.
    pub fn reset_consensus(&mut self) {
        self.round = 0;
        self.is_witness = false;
        self.fame = Fame::Undecided;
        self.round_received = None;
        self.consensus_timestamp = None;
    }

    /// Sort key of the total order.
    ///
    /// Returns None until the event has been received.
    pub fn order_key(&self) -> Option<(u64, i64, EventId)> {
        match (self.round_received, self.consensus_timestamp) {
            (Some(round), Some(ts)) => Some((round, ts, self.id)),
            _ => None,
        }
    }
}

/// Builder for creating events.
#[derive(Debug, Clone)]
pub struct EventBuilder {
    owner: PeerId,
    self_parent: Option<EventId>,
    other_parent: Option<EventId>,
    timestamp: i64,
    transactions: Vec<Bytes>,
}

impl EventBuilder {
    /// Start building an event for the given owner.
    pub fn new(owner: PeerId) -> Self {
        Self {
            owner,
            self_parent: None,
            other_parent: None,
            timestamp: 0,
            transactions: Vec::new(),
        }
    }

    /// Set both parents.
    pub fn parents(mut self, self_parent: EventId, other_parent: EventId) -> Self {
        self.self_parent = Some(self_parent);
        self.other_parent = Some(other_parent);
        self
    }

    /// Set the self-parent only.
    pub fn self_parent(mut self, id: EventId) -> Self {
        self.self_parent = Some(id);
        self
    }

    /// Set the other-parent only.
    pub fn other_parent(mut self, id: EventId) -> Self {
        self.other_parent = Some(id);
        self
    }

    /// Set the creation timestamp.
    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = ts;
        self
    }

    /// Append a transaction.
    pub fn transaction(mut self, tx: impl Into<Bytes>) -> Self {
        self.transactions.push(tx.into());
        self
    }

    /// Replace the transaction batch.
    pub fn transactions(mut self, txs: Vec<Bytes>) -> Self {
        self.transactions = txs;
        self
    }

    /// Build the event, computing its id.
    pub fn build(self) -> Event {
        let id = event_id_for(
            &self.owner,
            self.self_parent.as_ref(),
            self.other_parent.as_ref(),
            self.timestamp,
            &self.transactions,
        );

        Event {
            id,
            owner: self.owner,
            self_parent: self.self_parent,
            other_parent: self.other_parent,
            timestamp: self.timestamp,
            transactions: self.transactions,
            round: 0,
            is_witness: false,
            fame: Fame::Undecided,
            round_received: None,
            consensus_timestamp: None,
        }
    }
}
