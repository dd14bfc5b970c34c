//! # Hashgraph Consensus
//!
//! The deterministic local algorithm every peer runs over its copy of the
//! event graph.
//!
//! ## Overview
//!
//! Nothing here talks to the network. Given the same set of events, every
//! correct peer derives the same rounds, the same fame decisions, and the
//! same total order, no matter in which order the events arrived.
//!
//! ## Pipeline
//!
//! 1. **Round assignment** on insert: round and witness flag from strong
//!    seeing of the parent round's witnesses
//! 2. **Fame**: virtual voting by later witnesses, with periodic coin rounds
//! 3. **Ordering**: round received and consensus timestamp once a round's
//!    fame is fully decided
//!
//! ## Usage
//!
//! ```rust
//! use hashgraph_consensus::{ConsensusConfig, Hashgraph};
//! use hashgraph_core::{PeerId, PeerSet};
//!
//! let alice = PeerId::derive("alice");
//! let bob = PeerId::derive("bob");
//! let peers = PeerSet::new([alice, bob]).unwrap();
//!
//! let mut graph: Hashgraph = Hashgraph::new(peers, ConsensusConfig::default()).unwrap();
//! graph.create_genesis(alice, 1, Vec::new()).unwrap();
//! graph.create_genesis(bob, 1, Vec::new()).unwrap();
//! graph.create_event(alice, bob, 2, vec![b"hello".to_vec().into()]).unwrap();
//!
//! let delta = graph.run_consensus().unwrap();
//! println!("newly ordered: {}", delta.ordered.len());
//! ```

pub mod ancestry;
pub mod config;
pub mod error;
mod fame;
pub mod hashgraph;
pub mod order;
mod rounds;

#[cfg(test)]
mod testing;

pub use ancestry::{path_owners, sees, strongly_sees, Relations};
pub use config::ConsensusConfig;
pub use error::{ConsensusError, Result};
pub use hashgraph::{ConsensusDelta, Hashgraph, InsertResult};
pub use order::lower_median;
