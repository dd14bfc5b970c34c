//! Proptest generators for property-based testing.

use proptest::prelude::*;

use hashgraph_consensus::{ConsensusConfig, Hashgraph};
use hashgraph_core::{Event, EventBuilder, EventId, PeerId};
use hashgraph_store::{Store, StoreExt};

use crate::fixtures::DagBuilder;

/// Generate a random EventId.
pub fn event_id() -> impl Strategy<Value = EventId> {
    any::<[u8; 32]>().prop_map(EventId::from_bytes)
}

/// Generate a random PeerId.
pub fn peer_id() -> impl Strategy<Value = PeerId> {
    any::<[u8; 32]>().prop_map(PeerId::from_bytes)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=1_700_000_000_000i64
}

/// Generate a list of transaction payloads.
pub fn transactions(max: usize) -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..=max)
}

/// Generate a first event for a random owner.
pub fn first_event() -> impl Strategy<Value = Event> {
    (peer_id(), timestamp(), transactions(4)).prop_map(|(owner, ts, txs)| {
        EventBuilder::new(owner)
            .timestamp(ts)
            .transactions(txs.into_iter().map(Into::into).collect())
            .build()
    })
}

/// A gossip schedule: peer count plus a sequence of `(creator, other)` syncs.
#[derive(Debug, Clone)]
pub struct GossipSchedule {
    pub peers: usize,
    pub syncs: Vec<(usize, usize)>,
}

impl GossipSchedule {
    /// Replay the schedule on a single graph.
    pub fn build(&self, config: ConsensusConfig) -> Hashgraph {
        let mut dag = DagBuilder::with_config(self.peers, config);
        for (creator, other) in &self.syncs {
            dag.sync(*creator, *other);
        }
        dag.finish()
    }
}

/// Schedules over `peers` peers with up to `max_syncs` syncs.
pub fn gossip_schedule(
    peers: std::ops::RangeInclusive<usize>,
    max_syncs: usize,
) -> impl Strategy<Value = GossipSchedule> {
    peers.prop_flat_map(move |n| {
        let sync = (0..n, 1..n).prop_map(move |(creator, offset)| (creator, (creator + offset) % n));
        prop::collection::vec(sync, 0..=max_syncs)
            .prop_map(move |syncs| GossipSchedule { peers: n, syncs })
    })
}

impl Arbitrary for GossipSchedule {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        gossip_schedule(2..=5, 120).boxed()
    }
}

/// Every event of a graph, in insertion order.
pub fn all_events(graph: &Hashgraph) -> Vec<Event> {
    graph
        .store()
        .handles()
        .map(|h| graph.store().event(h).clone())
        .collect()
}

/// Insert `events` into a fresh graph, in the given order, retrying
/// events whose parents have not arrived yet.
pub fn replay(template: &Hashgraph, events: Vec<Event>) -> Hashgraph {
    let mut graph: Hashgraph =
        Hashgraph::new(template.peers().clone(), template.config().clone()).expect("valid config");
    let mut remaining = events;
    while !remaining.is_empty() {
        let before = remaining.len();
        remaining.retain(|event| match graph.insert(event.clone()) {
            Ok(_) => false,
            Err(e) if e.is_retryable() => true,
            Err(e) => panic!("replay rejected {}: {e}", event.id),
        });
        assert!(remaining.len() < before, "replay made no progress");
    }
    graph.run_consensus().expect("consensus");
    graph
}
