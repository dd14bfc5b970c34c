//! # Hashgraph Testkit
//!
//! Testing utilities for the hashgraph crates.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a single-graph [`DagBuilder`] and a multi-node [`TestNetwork`]
//! - **Generators**: proptest strategies for gossip schedules and events
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use hashgraph_consensus::ConsensusConfig;
//! use hashgraph_testkit::generators::{all_events, replay, GossipSchedule};
//!
//! proptest! {
//!     #[test]
//!     fn order_is_insertion_independent(schedule: GossipSchedule) {
//!         let live = schedule.build(ConsensusConfig::default());
//!         let mut events = all_events(&live);
//!         events.reverse();
//!         prop_assert_eq!(replay(&live, events).ordered_ids(), live.ordered_ids());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use hashgraph_testkit::DagBuilder;
//!
//! let mut dag = DagBuilder::new(4);
//! dag.lap();
//! let graph = dag.finish();
//! assert_eq!(graph.len(), 4 + 12);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{peer_ids, DagBuilder, TestNetwork};
pub use generators::{all_events, gossip_schedule, replay, GossipSchedule};
