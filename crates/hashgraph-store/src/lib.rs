//! # Hashgraph Store
//!
//! The event graph behind the [`Store`] trait.
//!
//! ## Key Types
//!
//! - [`Store`] - Synchronous interface over the append-only event graph
//! - [`MemoryStore`] - Arena implementation
//! - [`EventHandle`] - Opaque arena index, cheap to copy and compare
//! - [`StoredEvent`] - An event plus its resolved parent handles
//! - [`Fork`] - Evidence that an owner equivocated
//!
//! ## Usage
//!
//! ```rust
//! use hashgraph_core::{EventBuilder, PeerId};
//! use hashgraph_store::{MemoryStore, Store};
//!
//! let mut store = MemoryStore::new();
//! let alice = PeerId::derive("alice");
//! let first = EventBuilder::new(alice).timestamp(1).build();
//! let handle = store.add(first.clone()).unwrap();
//! assert_eq!(store.latest_of(&alice).unwrap(), handle);
//! ```
//!
//! ## Design Notes
//!
//! - **Parents before children**: unknown parents are rejected, not buffered
//! - **Fork detection**: an event that does not extend its owner's tail is kept
//!   off the chain as excluded, and the owner is flagged
//! - **Set-once derived fields**: round, fame, and consensus fields never revert

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use traits::{EventHandle, Fork, Store, StoreExt, StoredEvent};
