//! Shared helpers for the in-crate tests.
//!
//! A single graph stands in for a fully connected network: every peer
//! creates events against the global tails.

use bytes::Bytes;
use hashgraph_core::{PeerId, PeerSet};

use crate::config::ConsensusConfig;
use crate::hashgraph::Hashgraph;

pub(crate) fn peer(b: u8) -> PeerId {
    PeerId::from_bytes([b; 32])
}

/// A graph over peers `1..=n`, each with its genesis event.
pub(crate) fn graph_with_config(n: u8, config: ConsensusConfig) -> Hashgraph {
    let peers = PeerSet::new((1..=n).map(peer)).unwrap();
    let mut graph: Hashgraph = Hashgraph::new(peers, config).unwrap();
    for i in 1..=n {
        graph.create_genesis(peer(i), 0, Vec::new()).unwrap();
    }
    graph
}

/// Every ordered pair of distinct peers syncs once.
pub(crate) fn gossip_lap(graph: &mut Hashgraph, ts: &mut i64) {
    let peers: Vec<PeerId> = graph.peers().iter().copied().collect();
    for creator in &peers {
        for other in &peers {
            if creator == other {
                continue;
            }
            *ts += 1;
            let tx = Bytes::from(format!("{}@{}", &creator.to_hex()[..4], ts));
            graph.create_event(*creator, *other, *ts, vec![tx]).unwrap();
        }
    }
}

/// Gossip until some event reaches `round`. Returns the last timestamp used.
pub(crate) fn gossip_until_round(graph: &mut Hashgraph, round: u64, max_laps: usize) -> i64 {
    let mut ts = 0;
    for _ in 0..max_laps {
        if graph.max_round() >= round {
            return ts;
        }
        gossip_lap(graph, &mut ts);
    }
    assert!(graph.max_round() >= round, "round {} not reached", round);
    ts
}
