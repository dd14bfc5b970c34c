//! # Hashgraph
//!
//! A peer in an asynchronous Byzantine fault tolerant consensus network.
//!
//! ## Overview
//!
//! Peers gossip with one another. Each sync is recorded as a new event whose
//! parents are the syncing peer's previous event and the other peer's latest
//! event. From the resulting graph every peer independently derives, by
//! virtual voting, the same total order of events and their transactions.
//!
//! - **Events**: immutable, content-addressed, carry application transactions
//! - **Rounds and witnesses**: assigned from strongly-seeing supermajorities
//! - **Fame**: decided by virtual votes, with periodic coin rounds
//! - **Order**: round received, then consensus timestamp, then id
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use hashgraph::{Node, NodeConfig, SystemClock};
//! use hashgraph::core::PeerId;
//! use hashgraph::sync::MemoryNetwork;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> hashgraph::Result<()> {
//! let (alice, bob) = (PeerId::derive("alice"), PeerId::derive("bob"));
//! let network = MemoryNetwork::new();
//!
//! let mut nodes = Vec::new();
//! for id in [alice, bob] {
//!     let config = NodeConfig::new(id, vec![alice, bob]);
//!     let transport = Arc::new(network.transport(id, Duration::from_secs(1)));
//!     let node = Arc::new(Node::new(config, transport, Arc::new(SystemClock))?);
//!     network.register(id, node.clone()).await;
//!     nodes.push(node);
//! }
//!
//! nodes[0].submit_transaction(b"hello".to_vec()).await?;
//! for node in &nodes {
//!     node.gossip_pass().await?;
//! }
//! // Each node holds both genesis events plus one event per sync.
//! assert_eq!(nodes[0].snapshot().await.events, 3);
//! assert_eq!(nodes[1].snapshot().await.events, 4);
//! # Ok(())
//! # }
//! ```
//!
//! ## Re-exports
//!
//! - `hashgraph::core` - events, ids, peer sets
//! - `hashgraph::store` - event storage
//! - `hashgraph::consensus` - rounds, fame, ordering
//! - `hashgraph::sync` - gossip protocol and transports

pub mod clock;
pub mod config;
pub mod error;
pub mod node;

// Re-export component crates
pub use hashgraph_consensus as consensus;
pub use hashgraph_core as core;
pub use hashgraph_store as store;
pub use hashgraph_sync as sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use node::{GossipReport, Node, NodeSnapshot, PushReport};

pub use hashgraph_consensus::{ConsensusConfig, Hashgraph};
pub use hashgraph_core::{Event, EventId, PeerId};
pub use hashgraph_sync::{SyncConfig, SyncReport};
