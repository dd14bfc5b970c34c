//! # Hashgraph Core
//!
//! Pure primitives for the hashgraph: events, identifiers, canonical
//! encoding, and peer-set arithmetic.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Event`] - A node of the gossip DAG, created by one peer
//! - [`EventId`] - Content-addressed identifier (Blake3 hash)
//! - [`PeerId`] - Identity of a participating peer
//! - [`Fame`] - Tri-state outcome of virtual voting
//! - [`PeerSet`] - Fixed membership with supermajority thresholds
//!
//! ## Canonicalization
//!
//! Event ids are derived from deterministic CBOR. See [`canonical`] module.

pub mod canonical;
pub mod error;
pub mod event;
pub mod peers;
pub mod types;
pub mod validation;

pub use canonical::{canonical_event_bytes, event_id_for};
pub use error::{CoreError, ValidationError};
pub use event::{Event, EventBuilder, Fame, MAX_TRANSACTIONS_PER_EVENT};
pub use peers::{supermajority_threshold, PeerSet};
pub use types::{EventId, PeerId};
pub use validation::validate_event;
