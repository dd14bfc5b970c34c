//! Store trait: the abstract interface over the event graph.
//!
//! Events live in an append-only arena addressed by [`EventHandle`]. Two
//! indexes sit on top: id to handle, and owner to the ordered chain of that
//! owner's handles.
//!
//! The trait is synchronous. Callers serialize writers themselves (the node
//! holds one lock around merge and recompute), so implementations need no
//! interior locking.

use std::collections::BTreeMap;

use hashgraph_core::{Event, EventId, Fame, PeerId};

use crate::error::Result;

/// Opaque index of an event in the arena.
///
/// Handles are issued by [`Store::add`] and stay valid for the lifetime of
/// the store that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventHandle(pub(crate) u32);

impl EventHandle {
    /// Position in the arena (insertion order).
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An event plus the bookkeeping the store derives on insert.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// The event itself, including its derived consensus fields.
    pub event: Event,
    /// Resolved self-parent.
    pub self_parent: Option<EventHandle>,
    /// Resolved other-parent.
    pub other_parent: Option<EventHandle>,
    /// Distance from the owner's first event along self-parent links.
    pub chain_index: u64,
    /// Off its owner's chain: the event conflicts with an event already
    /// stored there, or descends from one that does. Kept so that later
    /// events can resolve it as a parent.
    pub excluded: bool,
    pub(crate) round_assigned: bool,
}

impl StoredEvent {
    /// Both parent handles, self-parent first.
    pub fn parents(&self) -> impl Iterator<Item = EventHandle> {
        self.self_parent.into_iter().chain(self.other_parent)
    }

    /// Whether round and witness flag have been set.
    pub fn has_round(&self) -> bool {
        self.round_assigned
    }
}

/// Evidence that an owner produced two events on the same chain position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fork {
    /// The equivocating peer.
    pub owner: PeerId,
    /// The event already stored at that position.
    pub existing: EventId,
    /// The later event, stored off the chain.
    pub conflicting: EventId,
}

/// Append-only event graph.
///
/// # Design Notes
///
/// - **Parents first**: `add` rejects an event whose parents are unknown.
/// - **One chain per owner**: an event that does not extend its owner's tail
///   is a fork. It is stored as excluded, off the chain, and the evidence is
///   recorded. Events built on an excluded self-parent are excluded too.
/// - **Set once**: round, fame, and consensus fields move from unset to a
///   final value exactly once. Re-setting the same value is a no-op.
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Graph
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert an event. Its derived consensus fields are cleared.
    ///
    /// Errors are checked in this order: `DuplicateId`, `InvalidParent`,
    /// `SelfParentOwner`. A fork is not an error; check
    /// [`StoredEvent::excluded`] on the returned handle.
    fn add(&mut self, event: Event) -> Result<EventHandle>;

    /// Get an event by id.
    fn get(&self, id: &EventId) -> Result<&Event>;

    /// Resolve an id to its handle.
    fn handle_of(&self, id: &EventId) -> Result<EventHandle>;

    /// Dereference a handle issued by this store.
    fn entry(&self, handle: EventHandle) -> &StoredEvent;

    /// Whether an event with this id is stored.
    fn contains(&self, id: &EventId) -> bool;

    /// Number of stored events.
    fn len(&self) -> usize;

    /// Whether the store holds no events.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All handles in insertion order.
    fn handles(&self) -> impl Iterator<Item = EventHandle> + '_;

    // ─────────────────────────────────────────────────────────────────────────
    // Per-peer chains
    // ─────────────────────────────────────────────────────────────────────────

    /// Tail of the peer's chain.
    fn latest_of(&self, peer: &PeerId) -> Result<EventHandle>;

    /// The peer's chain in creation order (empty if unknown). Excluded
    /// events are not part of it.
    fn chain(&self, peer: &PeerId) -> &[EventHandle];

    /// The peer's events with `round >= round`, in creation order.
    ///
    /// Lazy and restartable: clone the iterator to walk it again.
    fn events_from(
        &self,
        peer: PeerId,
        round: u64,
    ) -> impl Iterator<Item = EventHandle> + Clone + '_;

    /// Number of known events per peer.
    fn peer_counts(&self) -> BTreeMap<PeerId, u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Derived fields
    // ─────────────────────────────────────────────────────────────────────────

    /// Set round and witness flag.
    fn set_round(&mut self, handle: EventHandle, round: u64, is_witness: bool) -> Result<()>;

    /// Set the fame of a witness. `Fame::Undecided` is ignored.
    fn set_fame(&mut self, handle: EventHandle, fame: Fame) -> Result<()>;

    /// Set round received and consensus timestamp together.
    fn set_consensus(
        &mut self,
        handle: EventHandle,
        round_received: u64,
        consensus_timestamp: i64,
    ) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Forks
    // ─────────────────────────────────────────────────────────────────────────

    /// Record fork evidence.
    fn record_fork(&mut self, fork: Fork);

    /// All recorded fork evidence.
    fn forks(&self) -> &[Fork];

    /// Whether the peer has been caught forking.
    fn is_faulty(&self, peer: &PeerId) -> bool {
        self.forks().iter().any(|f| &f.owner == peer)
    }
}

/// Extension trait for common store patterns.
pub trait StoreExt: Store {
    /// Get the event behind a handle.
    fn event(&self, handle: EventHandle) -> &Event {
        &self.entry(handle).event
    }

    /// The peer's last `count` events, oldest first.
    ///
    /// Returns the whole chain if it is shorter than `count`.
    fn last_events(&self, peer: &PeerId, count: usize) -> &[EventHandle] {
        let chain = self.chain(peer);
        &chain[chain.len().saturating_sub(count)..]
    }

    /// Ids of the current tail of every known peer.
    fn tails(&self) -> BTreeMap<PeerId, EventId> {
        self.peer_counts()
            .keys()
            .filter_map(|peer| {
                let handle = self.latest_of(peer).ok()?;
                Some((*peer, self.event(handle).id))
            })
            .collect()
    }
}

impl<S: Store + ?Sized> StoreExt for S {}
