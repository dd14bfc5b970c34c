//! # Hashgraph Sync
//!
//! Gossip protocol that spreads events between peers.
//!
//! ## Overview
//!
//! Peers exchange per-peer event counts, then transfer exactly the trailing
//! events the caller lacks. After merging, the caller creates one new event
//! whose other-parent is the sender's latest event; that event is what
//! records the sync in the graph.
//!
//! ## Key Properties
//!
//! - **Idempotent**: re-delivered events are counted as duplicates
//! - **Order-insensitive**: events whose parents arrive later are retried
//! - **Bounded**: replies respect [`limits`] and the configured batch size
//!
//! ## Message Flow
//!
//! ```text
//! Peer A                                    Peer B
//!   |-------- GetMissingEventCounts ---------->|
//!   |<------- MissingEventCounts --------------|
//!   |-------- GetMissingEvents --------------->|
//!   |<------- SyncEvents ----------------------|
//!   |-------- GetEvents { ids } -------------->|   (unresolved parents,
//!   |<------- SyncEvents ----------------------|    usually fork branches)
//!
//! Push (A hands B what it lacks):
//!   |-------- GetMissingEventCounts {} ------->|
//!   |<------- MissingEventCounts --------------|
//!   |-------- SyncEvents --------------------->|
//!   |<------- Ack -----------------------------|
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use hashgraph_consensus::{ConsensusConfig, Hashgraph};
//! use hashgraph_core::{PeerId, PeerSet};
//! use hashgraph_sync::{apply_sync, collect_missing_events, missing_event_counts};
//!
//! let (a, b) = (PeerId::derive("a"), PeerId::derive("b"));
//! let peers = PeerSet::new([a, b]).unwrap();
//! let mut ga: Hashgraph = Hashgraph::new(peers.clone(), ConsensusConfig::default()).unwrap();
//! let mut gb: Hashgraph = Hashgraph::new(peers, ConsensusConfig::default()).unwrap();
//! ga.create_genesis(a, 0, vec![]).unwrap();
//! gb.create_genesis(b, 0, vec![]).unwrap();
//!
//! let counts = missing_event_counts(&gb, &ga.peer_counts());
//! let batch = collect_missing_events(&gb, &counts, Some(&b), 100);
//! let report = apply_sync(&mut ga, a, b, batch, 1, vec![]).unwrap();
//! assert_eq!(report.merge.accepted.len(), 1);
//! assert_eq!(ga.len(), 3);
//! ```

pub mod convergence;
pub mod error;
pub mod messages;
pub mod protocol;
pub mod serde_millis;
pub mod transport;

pub use convergence::{order_hash, verify_all, verify_convergence, ConvergenceResult};
pub use error::{Result, SyncError};
pub use messages::{limits, PeerCounts, SyncErrorCode, SyncMessage, PROTOCOL_VERSION};
pub use protocol::{
    answer_query, apply_sync, collect_events_by_id, collect_missing_events, expect_counts,
    expect_events, extend_batch, merge_events, missing_event_counts, unresolved_parents,
    MergeReport, SyncConfig, SyncReport,
};
pub use transport::{
    decode_message, encode_message, memory::MemoryNetwork, memory::MemoryTransport, SyncHandler,
    Transport,
};
