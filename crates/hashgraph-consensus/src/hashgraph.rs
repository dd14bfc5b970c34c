//! The per-peer consensus aggregate.
//!
//! [`Hashgraph`] owns the event store together with everything derived from
//! it: witness index, vote memo, decided-round frontier, and the total order
//! emitted so far. Every mutation goes through `&mut self`; callers that
//! share a graph across tasks wrap it in a single lock.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use bytes::Bytes;
use hashgraph_core::{validate_event, Event, EventBuilder, EventId, Fame, PeerId, PeerSet};
use hashgraph_store::{EventHandle, MemoryStore, Store, StoreError, StoreExt};

use crate::ancestry::Relations;
use crate::config::ConsensusConfig;
use crate::error::Result;

/// Result of inserting an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// The event was new and has been assigned a round.
    Inserted(EventHandle),
    /// The event was already known (idempotent, not an error).
    AlreadyExists,
    /// The event conflicts with its owner's chain. It is stored so that
    /// later events can name it as a parent, but never becomes a witness
    /// and is never ordered.
    Excluded(EventHandle),
}

/// What one consensus pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsensusDelta {
    /// Witnesses whose fame was decided in this pass.
    pub decided: Vec<EventId>,
    /// Events appended to the total order in this pass, in order.
    pub ordered: Vec<EventId>,
    /// Highest round whose fame is fully decided, if any.
    pub last_decided_round: Option<u64>,
}

impl ConsensusDelta {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.decided.is_empty() && self.ordered.is_empty()
    }
}

/// One peer's view of the hashgraph plus its derived consensus state.
#[derive(Debug)]
pub struct Hashgraph<S = MemoryStore> {
    pub(crate) store: S,
    pub(crate) peers: PeerSet,
    pub(crate) config: ConsensusConfig,
    pub(crate) relations: Relations,

    /// round -> owner -> witness.
    pub(crate) witnesses: BTreeMap<u64, BTreeMap<PeerId, EventHandle>>,

    /// (voter, candidate) -> vote.
    pub(crate) votes: HashMap<(EventHandle, EventHandle), bool>,

    /// Rounds below this one have every known witness decided.
    pub(crate) next_undecided_round: u64,

    /// Events without a round received, in insertion order.
    pub(crate) pending: BTreeSet<EventHandle>,

    /// The total order emitted so far.
    pub(crate) ordered: Vec<EventHandle>,
}

impl<S: Store + Default> Hashgraph<S> {
    /// Create an empty graph over a fixed peer set.
    pub fn new(peers: PeerSet, config: ConsensusConfig) -> Result<Self> {
        Self::with_store(S::default(), peers, config)
    }
}

impl<S: Store> Hashgraph<S> {
    /// Create a graph on top of an empty store.
    pub fn with_store(store: S, peers: PeerSet, config: ConsensusConfig) -> Result<Self> {
        config.validate()?;
        let mut graph = Self {
            store,
            peers,
            config,
            relations: Relations::new(),
            witnesses: BTreeMap::new(),
            votes: HashMap::new(),
            next_undecided_round: 0,
            pending: BTreeSet::new(),
            ordered: Vec::new(),
        };
        let existing: Vec<EventHandle> = graph.store.handles().collect();
        for handle in existing {
            graph.assign_round(handle)?;
            if !graph.store.entry(handle).excluded {
                graph.pending.insert(handle);
            }
        }
        Ok(graph)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate, store, and assign a round to an event.
    ///
    /// Duplicates are accepted as no-ops. A fork is stored off its owner's
    /// chain and the owner is flagged as faulty.
    pub fn insert(&mut self, event: Event) -> Result<InsertResult> {
        validate_event(&event, &self.peers)?;

        let (id, owner) = (event.id, event.owner);
        let handle = match self.store.add(event) {
            Ok(handle) => handle,
            Err(StoreError::DuplicateId(_)) => return Ok(InsertResult::AlreadyExists),
            Err(e) => return Err(e.into()),
        };

        self.assign_round(handle)?;
        if self.store.entry(handle).excluded {
            tracing::warn!(%owner, event = %id, "event off its owner's chain, excluded from consensus");
            return Ok(InsertResult::Excluded(handle));
        }
        self.pending.insert(handle);
        Ok(InsertResult::Inserted(handle))
    }

    /// Create `creator`'s first event.
    pub fn create_genesis(
        &mut self,
        creator: PeerId,
        timestamp: i64,
        transactions: Vec<Bytes>,
    ) -> Result<EventId> {
        let event = EventBuilder::new(creator)
            .timestamp(timestamp)
            .transactions(transactions)
            .build();
        let id = event.id;
        self.insert(event)?;
        Ok(id)
    }

    /// Create an event for `creator` on top of its own tail, with the tail of
    /// `other` as other-parent.
    pub fn create_event(
        &mut self,
        creator: PeerId,
        other: PeerId,
        timestamp: i64,
        transactions: Vec<Bytes>,
    ) -> Result<EventId> {
        let self_parent = self.store.event(self.store.latest_of(&creator)?).id;
        let other_parent = self.store.event(self.store.latest_of(&other)?).id;

        let event = EventBuilder::new(creator)
            .parents(self_parent, other_parent)
            .timestamp(timestamp)
            .transactions(transactions)
            .build();
        let id = event.id;
        self.insert(event)?;
        Ok(id)
    }

    /// Decide fame where possible and extend the total order.
    pub fn run_consensus(&mut self) -> Result<ConsensusDelta> {
        let decided = self.decide_fame()?;
        self.advance_decided_rounds();
        let ordered = self.find_order()?;
        self.prune_memos();

        if !ordered.is_empty() {
            tracing::debug!(
                count = ordered.len(),
                total = self.ordered.len(),
                last_decided_round = ?self.last_decided_round(),
                "extended consensus order"
            );
        }

        Ok(ConsensusDelta {
            decided: decided.iter().map(|h| self.store.event(*h).id).collect(),
            ordered,
            last_decided_round: self.last_decided_round(),
        })
    }

    /// Forget relation answers about settled targets and votes on decided
    /// candidates.
    ///
    /// A target is settled once it is ordered, or once it is a witness below
    /// the decided frontier. Nothing asks about those again except a late
    /// event's round assignment, which recomputes.
    fn prune_memos(&mut self) {
        let store = &self.store;
        let frontier = self.next_undecided_round;
        self.relations.retain(|b| {
            let entry = store.entry(b);
            let event = &entry.event;
            !entry.excluded
                && event.round_received.is_none()
                && !(event.is_witness && event.round < frontier)
        });
        self.votes
            .retain(|(_, candidate), _| !store.event(*candidate).fame.is_decided());
    }

    fn advance_decided_rounds(&mut self) {
        while let Some(round) = self.witnesses.get(&self.next_undecided_round) {
            let all_decided = round
                .values()
                .all(|h| self.store.event(*h).fame.is_decided());
            if !all_decided {
                break;
            }
            self.next_undecided_round += 1;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The fixed peer set.
    pub fn peers(&self) -> &PeerSet {
        &self.peers
    }

    /// The consensus configuration.
    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Get an event by id.
    pub fn get(&self, id: &EventId) -> Result<&Event> {
        Ok(self.store.get(id)?)
    }

    /// Whether the event is known.
    pub fn contains(&self, id: &EventId) -> bool {
        self.store.contains(id)
    }

    /// Number of known events.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Id of the peer's latest event.
    pub fn latest_of(&self, peer: &PeerId) -> Result<EventId> {
        Ok(self.store.event(self.store.latest_of(peer)?).id)
    }

    /// Number of known events per peer.
    pub fn peer_counts(&self) -> BTreeMap<PeerId, u64> {
        self.store.peer_counts()
    }

    /// Whether `a` has `b` as an ancestor.
    pub fn see(&mut self, a: &EventId, b: &EventId) -> Result<bool> {
        let a = self.store.handle_of(a)?;
        let b = self.store.handle_of(b)?;
        Ok(self.relations.see(&self.store, a, b))
    }

    /// Whether `a` strongly sees `b`.
    pub fn strongly_see(&mut self, a: &EventId, b: &EventId) -> Result<bool> {
        let a = self.store.handle_of(a)?;
        let b = self.store.handle_of(b)?;
        Ok(self.relations.strongly_see(&self.store, &self.peers, a, b))
    }

    /// Highest assigned round.
    pub fn max_round(&self) -> u64 {
        self.witnesses.keys().next_back().copied().unwrap_or(0)
    }

    /// Witnesses of a round, ordered by owner.
    pub fn witnesses(&self, round: u64) -> Vec<EventId> {
        self.witness_handles(round)
            .into_iter()
            .map(|h| self.store.event(h).id)
            .collect()
    }

    /// The witness `peer` created in `round`, found by walking its chain.
    ///
    /// Agrees with [`witnesses`](Self::witnesses) for honest peers; a
    /// faulty peer can have more than one.
    pub fn witness_of(&self, peer: PeerId, round: u64) -> Option<EventId> {
        self.store
            .events_from(peer, round)
            .take_while(|h| self.store.event(*h).round == round)
            .map(|h| self.store.event(h))
            .find(|e| e.is_witness)
            .map(|e| e.id)
    }

    /// Witnesses of a round decided famous, ordered by owner.
    pub fn famous_witnesses(&self, round: u64) -> Vec<EventId> {
        self.famous_handles(round)
            .into_iter()
            .map(|h| self.store.event(h).id)
            .collect()
    }

    /// Highest round whose witnesses are all decided.
    pub fn last_decided_round(&self) -> Option<u64> {
        self.next_undecided_round.checked_sub(1)
    }

    /// Ids in consensus order.
    pub fn ordered_ids(&self) -> Vec<EventId> {
        self.ordered.iter().map(|h| self.store.event(*h).id).collect()
    }

    /// Events in consensus order.
    pub fn ordered_events(&self) -> impl Iterator<Item = &Event> + '_ {
        self.ordered.iter().map(|h| self.store.event(*h))
    }

    /// Transactions of ordered events, flattened in consensus order.
    pub fn ordered_transactions(&self) -> Vec<Bytes> {
        self.ordered_events()
            .flat_map(|e| e.transactions.iter().cloned())
            .collect()
    }

    /// Number of events not yet ordered.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the peer has been caught forking.
    pub fn is_faulty(&self, peer: &PeerId) -> bool {
        self.store.is_faulty(peer)
    }

    /// Peers caught forking, in id order.
    pub fn faulty_peers(&self) -> Vec<PeerId> {
        let owners: BTreeSet<PeerId> = self.store.forks().iter().map(|f| f.owner).collect();
        owners.into_iter().collect()
    }

    /// Round assigned to an event.
    pub fn round_of(&self, id: &EventId) -> Result<u64> {
        Ok(self.get(id)?.round)
    }

    pub(crate) fn witness_handles(&self, round: u64) -> Vec<EventHandle> {
        self.witnesses
            .get(&round)
            .map(|w| w.values().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn famous_handles(&self, round: u64) -> Vec<EventHandle> {
        self.witness_handles(round)
            .into_iter()
            .filter(|h| self.store.event(*h).fame == Fame::Famous)
            .collect()
    }
}
