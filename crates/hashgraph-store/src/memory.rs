//! In-memory arena implementation of the Store trait.
//!
//! Nothing is persisted. Dropping the store drops the graph.

use std::collections::{BTreeMap, HashMap};

use hashgraph_core::{Event, EventId, Fame, PeerId};

use crate::error::{Result, StoreError};
use crate::traits::{EventHandle, Fork, Store, StoredEvent};

/// Arena-backed event store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    /// Events in insertion order.
    arena: Vec<StoredEvent>,

    /// Id index.
    by_id: HashMap<EventId, EventHandle>,

    /// Owner index: each owner's chain in creation order.
    by_owner: BTreeMap<PeerId, Vec<EventHandle>>,

    /// Fork evidence.
    forks: Vec<Fork>,
}

enum Placement {
    /// Appended to the owner's chain at this index.
    Chain(u64),
    /// Kept off the chain. `fork` is set when this event is the one that
    /// conflicts.
    Excluded { chain_index: u64, fork: Option<Fork> },
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve_parent(&self, event: &EventId, parent: Option<&EventId>) -> Result<Option<EventHandle>> {
        match parent {
            None => Ok(None),
            Some(parent) => self
                .by_id
                .get(parent)
                .copied()
                .map(Some)
                .ok_or(StoreError::InvalidParent {
                    event: *event,
                    parent: *parent,
                }),
        }
    }

    /// Where `event` lands relative to its owner's chain.
    fn place(&self, event: &Event, self_parent: Option<EventHandle>) -> Result<Placement> {
        let chain = self.chain(&event.owner);

        let Some(sp) = self_parent else {
            return Ok(match chain.first() {
                None => Placement::Chain(0),
                Some(&first) => Placement::Excluded {
                    chain_index: 0,
                    fork: Some(self.fork_with(event, first)),
                },
            });
        };

        let parent = &self.arena[sp.index()];
        if parent.event.owner != event.owner {
            return Err(StoreError::SelfParentOwner {
                event: event.id,
                self_parent: parent.event.id,
            });
        }

        let next = parent.chain_index + 1;
        if parent.excluded {
            return Ok(Placement::Excluded {
                chain_index: next,
                fork: None,
            });
        }
        Ok(match chain.get(next as usize) {
            None => Placement::Chain(next),
            Some(&existing) => Placement::Excluded {
                chain_index: next,
                fork: Some(self.fork_with(event, existing)),
            },
        })
    }

    fn fork_with(&self, event: &Event, existing: EventHandle) -> Fork {
        Fork {
            owner: event.owner,
            existing: self.arena[existing.index()].event.id,
            conflicting: event.id,
        }
    }

    fn entry_mut(&mut self, handle: EventHandle) -> &mut StoredEvent {
        &mut self.arena[handle.index()]
    }
}

impl Store for MemoryStore {
    fn add(&mut self, mut event: Event) -> Result<EventHandle> {
        if self.by_id.contains_key(&event.id) {
            return Err(StoreError::DuplicateId(event.id));
        }

        let self_parent = self.resolve_parent(&event.id, event.self_parent.as_ref())?;
        let other_parent = self.resolve_parent(&event.id, event.other_parent.as_ref())?;
        let placement = self.place(&event, self_parent)?;

        event.reset_consensus();

        let handle = EventHandle(self.arena.len() as u32);
        let (chain_index, excluded) = match placement {
            Placement::Chain(chain_index) => {
                self.by_owner.entry(event.owner).or_default().push(handle);
                (chain_index, false)
            }
            Placement::Excluded { chain_index, fork } => {
                if let Some(fork) = fork {
                    self.record_fork(fork);
                }
                (chain_index, true)
            }
        };
        self.by_id.insert(event.id, handle);
        self.arena.push(StoredEvent {
            event,
            self_parent,
            other_parent,
            chain_index,
            excluded,
            round_assigned: false,
        });

        Ok(handle)
    }

    fn get(&self, id: &EventId) -> Result<&Event> {
        let handle = self.handle_of(id)?;
        Ok(&self.arena[handle.index()].event)
    }

    fn handle_of(&self, id: &EventId) -> Result<EventHandle> {
        self.by_id.get(id).copied().ok_or(StoreError::NotFound(*id))
    }

    fn entry(&self, handle: EventHandle) -> &StoredEvent {
        &self.arena[handle.index()]
    }

    fn contains(&self, id: &EventId) -> bool {
        self.by_id.contains_key(id)
    }

    fn len(&self) -> usize {
        self.arena.len()
    }

    fn handles(&self) -> impl Iterator<Item = EventHandle> + '_ {
        (0..self.arena.len() as u32).map(EventHandle)
    }

    fn latest_of(&self, peer: &PeerId) -> Result<EventHandle> {
        self.chain(peer)
            .last()
            .copied()
            .ok_or(StoreError::UnknownPeer(*peer))
    }

    fn chain(&self, peer: &PeerId) -> &[EventHandle] {
        self.by_owner.get(peer).map(Vec::as_slice).unwrap_or(&[])
    }

    fn events_from(
        &self,
        peer: PeerId,
        round: u64,
    ) -> impl Iterator<Item = EventHandle> + Clone + '_ {
        // Rounds never decrease along a chain, so everything after the first
        // match qualifies.
        self.chain(&peer)
            .iter()
            .copied()
            .skip_while(move |h| self.arena[h.index()].event.round < round)
    }

    fn peer_counts(&self) -> BTreeMap<PeerId, u64> {
        self.by_owner
            .iter()
            .map(|(peer, chain)| (*peer, chain.len() as u64))
            .collect()
    }

    fn set_round(&mut self, handle: EventHandle, round: u64, is_witness: bool) -> Result<()> {
        let entry = self.entry_mut(handle);
        if entry.round_assigned {
            if entry.event.round != round || entry.event.is_witness != is_witness {
                return Err(StoreError::AlreadyDecided {
                    id: entry.event.id,
                    field: "round",
                });
            }
            return Ok(());
        }
        entry.event.round = round;
        entry.event.is_witness = is_witness;
        entry.round_assigned = true;
        Ok(())
    }

    fn set_fame(&mut self, handle: EventHandle, fame: Fame) -> Result<()> {
        let entry = self.entry_mut(handle);
        if !fame.is_decided() {
            return Ok(());
        }
        match entry.event.fame {
            Fame::Undecided => {
                entry.event.fame = fame;
                Ok(())
            }
            current if current == fame => Ok(()),
            _ => Err(StoreError::AlreadyDecided {
                id: entry.event.id,
                field: "fame",
            }),
        }
    }

    fn set_consensus(
        &mut self,
        handle: EventHandle,
        round_received: u64,
        consensus_timestamp: i64,
    ) -> Result<()> {
        let entry = self.entry_mut(handle);
        match (entry.event.round_received, entry.event.consensus_timestamp) {
            (None, _) => {
                entry.event.round_received = Some(round_received);
                entry.event.consensus_timestamp = Some(consensus_timestamp);
                Ok(())
            }
            (Some(r), Some(ts)) if r == round_received && ts == consensus_timestamp => Ok(()),
            _ => Err(StoreError::AlreadyDecided {
                id: entry.event.id,
                field: "round_received",
            }),
        }
    }

    fn record_fork(&mut self, fork: Fork) {
        if self.forks.contains(&fork) {
            return;
        }
        tracing::debug!(owner = %fork.owner, existing = %fork.existing, conflicting = %fork.conflicting, "recorded fork evidence");
        self.forks.push(fork);
    }

    fn forks(&self) -> &[Fork] {
        &self.forks
    }
}
