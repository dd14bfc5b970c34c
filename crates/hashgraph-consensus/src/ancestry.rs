//! Ancestry ("see") and strong-seeing relations.
//!
//! Both are pure functions of the graph: once an event is stored its set of
//! ancestors never changes. [`Relations`] memoizes answers per pair for the
//! lifetime of the graph.
//!
//! Traversals use an explicit stack and a visited set, so deep graphs cannot
//! overflow the call stack.

use std::collections::{HashMap, HashSet};

use hashgraph_core::{PeerId, PeerSet};
use hashgraph_store::{EventHandle, Store, StoredEvent};

/// Whether `a` has `b` as an ancestor (or is `b`).
pub fn sees<S: Store>(store: &S, a: EventHandle, b: EventHandle) -> bool {
    if a == b {
        return true;
    }

    let target = store.entry(b);
    let mut visited = HashSet::new();
    let mut stack = vec![a];
    visited.insert(a);

    while let Some(x) = stack.pop() {
        if x == b {
            return true;
        }
        let entry = store.entry(x);

        // A chain is linear: the owner's own history decides it.
        if let Some(reach) = same_chain_reach(entry, target) {
            if reach {
                return true;
            }
            continue;
        }

        for parent in entry.parents() {
            if !visited.insert(parent) {
                continue;
            }
            if below(store.entry(parent), target) {
                continue;
            }
            stack.push(parent);
        }
    }

    false
}

/// Whether `a` strongly sees `b`.
///
/// Collects the owners of every event that lies on some path from `a` down
/// to `b` (both endpoints included) and checks that they form a
/// supermajority of `peers`.
pub fn strongly_sees<S: Store>(
    store: &S,
    peers: &PeerSet,
    a: EventHandle,
    b: EventHandle,
) -> bool {
    let owners = path_owners(store, a, b);
    peers.is_supermajority(owners.len())
}

/// Distinct owners of events on any path from `a` to `b`.
///
/// Excluded events do not contribute their owner. Empty if `a` does not see
/// `b`.
pub fn path_owners<S: Store>(store: &S, a: EventHandle, b: EventHandle) -> HashSet<PeerId> {
    let target = store.entry(b);

    // reach[x] == whether x sees b, for every x visited.
    let mut reach: HashMap<EventHandle, bool> = HashMap::new();
    let mut stack = vec![(a, false)];

    while let Some((x, expanded)) = stack.pop() {
        if expanded {
            let entry = store.entry(x);
            let hit = same_chain_reach(entry, target).unwrap_or(false)
                || entry.parents().any(|p| reach.get(&p).copied().unwrap_or(false));
            reach.insert(x, hit);
            continue;
        }
        if reach.contains_key(&x) {
            continue;
        }
        if x == b {
            reach.insert(x, true);
            continue;
        }

        let entry = store.entry(x);
        if same_chain_reach(entry, target) == Some(false) {
            reach.insert(x, false);
            continue;
        }

        stack.push((x, true));
        for parent in entry.parents() {
            if reach.contains_key(&parent) {
                continue;
            }
            if below(store.entry(parent), target) {
                reach.insert(parent, false);
                continue;
            }
            stack.push((parent, false));
        }
    }

    reach
        .into_iter()
        .filter(|(_, hit)| *hit)
        .map(|(x, _)| store.entry(x))
        .filter(|entry| !entry.excluded)
        .map(|entry| entry.event.owner)
        .collect()
}

/// For an event on the target's own chain, whether it is at or after it.
///
/// None when either event is off its chain; those need a real traversal.
fn same_chain_reach(entry: &StoredEvent, target: &StoredEvent) -> Option<bool> {
    let linear = entry.event.owner == target.event.owner && !entry.excluded && !target.excluded;
    linear.then_some(entry.chain_index >= target.chain_index)
}

/// An event with a lower round than the target cannot have it as ancestor.
fn below(entry: &StoredEvent, target: &StoredEvent) -> bool {
    entry.has_round() && target.has_round() && entry.event.round < target.event.round
}

/// Memoized relation answers keyed by `(a, b)`.
#[derive(Debug, Default)]
pub struct Relations {
    pub(crate) see: HashMap<(EventHandle, EventHandle), bool>,
    pub(crate) strong: HashMap<(EventHandle, EventHandle), bool>,
}

impl Relations {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached [`sees`].
    pub fn see<S: Store>(&mut self, store: &S, a: EventHandle, b: EventHandle) -> bool {
        *self.see.entry((a, b)).or_insert_with(|| sees(store, a, b))
    }

    /// Cached [`strongly_sees`].
    pub fn strongly_see<S: Store>(
        &mut self,
        store: &S,
        peers: &PeerSet,
        a: EventHandle,
        b: EventHandle,
    ) -> bool {
        if let Some(&known) = self.strong.get(&(a, b)) {
            return known;
        }
        let result = self.see(store, a, b) && strongly_sees(store, peers, a, b);
        self.strong.insert((a, b), result);
        result
    }

    /// Drop every answer about a target `b` for which `keep(b)` is false.
    ///
    /// Answers are pure, so a dropped pair is recomputed if asked again.
    pub fn retain(&mut self, mut keep: impl FnMut(EventHandle) -> bool) {
        self.see.retain(|(_, b), _| keep(*b));
        self.strong.retain(|(_, b), _| keep(*b));
    }

    /// Number of memoized pairs.
    pub fn len(&self) -> usize {
        self.see.len() + self.strong.len()
    }

    /// Whether nothing has been memoized yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
