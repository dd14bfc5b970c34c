//! Round assignment.
//!
//! An event's round is the highest round among its parents, plus one if it
//! strongly sees a supermajority of that round's witnesses. It is a witness
//! when its round exceeds its self-parent's (or it has no self-parent).
//! Excluded events get a round, so their descendants stay monotonic, but
//! are never witnesses.

use hashgraph_store::{EventHandle, Store, StoreExt};

use crate::error::Result;
use crate::hashgraph::Hashgraph;

impl<S: Store> Hashgraph<S> {
    /// Assign round and witness flag to a freshly stored event.
    pub(crate) fn assign_round(&mut self, handle: EventHandle) -> Result<()> {
        let (round, is_witness) = self.compute_round(handle);
        self.store.set_round(handle, round, is_witness)?;

        if is_witness {
            let owner = self.store.event(handle).owner;
            self.witnesses
                .entry(round)
                .or_default()
                .entry(owner)
                .or_insert(handle);
        }
        Ok(())
    }

    fn compute_round(&mut self, handle: EventHandle) -> (u64, bool) {
        let entry = self.store.entry(handle);
        let self_parent = entry.self_parent;
        let excluded = entry.excluded;
        let parents: Vec<EventHandle> = entry.parents().collect();

        let Some(parent_round) = parents
            .iter()
            .map(|p| self.store.event(*p).round)
            .max()
        else {
            return (0, !excluded);
        };

        let strongly_seen = self
            .witness_handles(parent_round)
            .into_iter()
            .filter(|w| {
                self.relations
                    .strongly_see(&self.store, &self.peers, handle, *w)
            })
            .count();

        let round = if self.peers.is_supermajority(strongly_seen) {
            tracing::trace!(round = parent_round + 1, strongly_seen, "event promoted");
            parent_round + 1
        } else {
            parent_round
        };

        let is_witness = !excluded
            && match self_parent {
                None => true,
                Some(sp) => round > self.store.event(sp).round,
            };
        (round, is_witness)
    }
}

#[cfg(test)]
mod tests {
    use hashgraph_core::{PeerId, PeerSet};
    use hashgraph_store::Store;

    use crate::config::ConsensusConfig;
    use crate::hashgraph::Hashgraph;

    fn peer(b: u8) -> PeerId {
        PeerId::from_bytes([b; 32])
    }

    fn graph(n: u8) -> Hashgraph {
        let peers = PeerSet::new((1..=n).map(peer)).unwrap();
        let mut graph: Hashgraph = Hashgraph::new(peers, ConsensusConfig::default()).unwrap();
        for i in 1..=n {
            graph.create_genesis(peer(i), 0, Vec::new()).unwrap();
        }
        graph
    }

    #[test]
    fn test_first_event_is_round_zero_witness() {
        let graph = graph(4);
        for i in 1..=4 {
            let id = graph.latest_of(&peer(i)).unwrap();
            let event = graph.get(&id).unwrap();
            assert_eq!(event.round, 0);
            assert!(event.is_witness);
        }
        assert_eq!(graph.witnesses(0).len(), 4);
    }

    #[test]
    fn test_non_promoted_event_is_not_witness() {
        let mut graph = graph(4);
        let id = graph.create_event(peer(1), peer(2), 1, Vec::new()).unwrap();
        let event = graph.get(&id).unwrap();
        assert_eq!(event.round, 0);
        assert!(!event.is_witness);
    }

    #[test]
    fn test_promotion_after_strongly_seeing_all() {
        let mut graph = graph(4);
        // Two laps of the relay 1 -> 2 -> 3 -> 4 -> 1.
        let mut ts = 0;
        for _ in 0..2 {
            for (owner, other) in [(2, 1), (3, 2), (4, 3), (1, 4)] {
                ts += 1;
                graph.create_event(peer(owner), peer(other), ts, Vec::new()).unwrap();
            }
        }
        let top = graph.latest_of(&peer(1)).unwrap();
        let event = graph.get(&top).unwrap().clone();
        assert_eq!(event.round, 1);

        let witnesses = graph.witnesses(1);
        assert!(witnesses
            .iter()
            .any(|w| graph.get(w).unwrap().owner == peer(1)));
    }

    #[test]
    fn test_round_monotonic_and_witness_rule() {
        let mut graph = graph(4);
        let mut ts = 0;
        for step in 0..60u8 {
            let owner = step % 4 + 1;
            let other = (step % 4 + step / 4 % 3 + 1) % 4 + 1;
            ts += 1;
            graph.create_event(peer(owner), peer(other), ts, Vec::new()).unwrap();
        }

        let events: Vec<_> = graph.store().handles().collect();
        for h in events {
            let event = graph.store().entry(h).event.clone();
            let self_round = event
                .self_parent
                .map(|p| graph.get(&p).unwrap().round);
            for parent in [event.self_parent, event.other_parent].into_iter().flatten() {
                assert!(event.round >= graph.get(&parent).unwrap().round);
            }
            match self_round {
                None => assert!(event.is_witness),
                Some(r) => assert_eq!(event.is_witness, event.round > r),
            }
        }
    }

    #[test]
    fn test_witness_of_matches_index() {
        let mut graph = crate::testing::graph_with_config(4, ConsensusConfig::default());
        crate::testing::gossip_until_round(&mut graph, 3, 40);

        for round in 0..=graph.max_round() {
            let indexed = graph.witnesses(round);
            let walked: Vec<_> = (1..=4)
                .filter_map(|i| graph.witness_of(peer(i), round))
                .collect();
            assert_eq!(walked.len(), indexed.len());
            for id in walked {
                assert!(indexed.contains(&id));
            }
        }
        assert_eq!(graph.witness_of(peer(1), graph.max_round() + 1), None);
    }
}
