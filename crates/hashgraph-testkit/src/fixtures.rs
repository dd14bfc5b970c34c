//! Test fixtures and helpers.
//!
//! Common setup code for integration tests and benchmarks.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hashgraph::{ManualClock, Node, NodeConfig, NodeSnapshot};
use hashgraph_consensus::{ConsensusConfig, Hashgraph};
use hashgraph_core::{EventId, PeerId, PeerSet};
use hashgraph_sync::MemoryNetwork;

/// Deterministic peer ids `peer-0 .. peer-{n-1}`.
pub fn peer_ids(n: usize) -> Vec<PeerId> {
    (0..n).map(|i| PeerId::derive(&format!("peer-{i}"))).collect()
}

/// A single graph standing in for a fully connected network.
///
/// Every sync is applied directly: the creator's new event takes the other
/// peer's current tail as other-parent, as if the sync had just happened.
pub struct DagBuilder {
    peers: Vec<PeerId>,
    graph: Hashgraph,
    clock: i64,
}

impl DagBuilder {
    /// `n` peers, each with its first event.
    pub fn new(n: usize) -> Self {
        Self::with_config(n, ConsensusConfig::default())
    }

    /// Same as [`new`](Self::new) with explicit consensus parameters.
    pub fn with_config(n: usize, config: ConsensusConfig) -> Self {
        let peers = peer_ids(n);
        let set = PeerSet::new(peers.iter().copied()).expect("at least one peer");
        let mut graph: Hashgraph = Hashgraph::new(set, config).expect("valid config");
        for (i, peer) in peers.iter().enumerate() {
            graph
                .create_genesis(*peer, i as i64, Vec::new())
                .expect("genesis");
        }
        Self {
            peers,
            graph,
            clock: n as i64,
        }
    }

    /// The peers, indexed as in [`sync`](Self::sync).
    pub fn peers(&self) -> &[PeerId] {
        &self.peers
    }

    /// `creator` records a sync with `other`, carrying one transaction.
    pub fn sync(&mut self, creator: usize, other: usize) -> EventId {
        self.clock += 1;
        let tx = Bytes::from(format!("{creator}->{other}@{}", self.clock));
        self.graph
            .create_event(self.peers[creator], self.peers[other], self.clock, vec![tx])
            .expect("sync between known peers")
    }

    /// Every ordered pair of distinct peers syncs once.
    pub fn lap(&mut self) {
        let n = self.peers.len();
        for creator in 0..n {
            for other in 0..n {
                if creator != other {
                    self.sync(creator, other);
                }
            }
        }
    }

    /// `count` syncs between random distinct peers.
    pub fn random_syncs(&mut self, seed: u64, count: usize) {
        let n = self.peers.len();
        if n < 2 {
            return;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..count {
            let creator = rng.gen_range(0..n);
            let other = (creator + rng.gen_range(1..n)) % n;
            self.sync(creator, other);
        }
    }

    /// Run consensus and return the graph.
    pub fn finish(mut self) -> Hashgraph {
        self.graph.run_consensus().expect("consensus");
        self.graph
    }

    /// The graph built so far.
    pub fn graph(&mut self) -> &mut Hashgraph {
        &mut self.graph
    }
}

/// Nodes wired together over an in-memory network.
pub struct TestNetwork {
    /// The shared network, for disconnecting peers.
    pub network: Arc<MemoryNetwork>,
    /// The nodes, in peer order.
    pub nodes: Vec<Arc<Node>>,
}

impl TestNetwork {
    /// Start `n` nodes with manual clocks.
    pub async fn new(n: usize) -> Self {
        let ids = peer_ids(n);
        let network = MemoryNetwork::new();
        let mut nodes = Vec::with_capacity(n);
        for (i, id) in ids.iter().enumerate() {
            let config = NodeConfig::new(*id, ids.clone());
            let transport = Arc::new(network.transport(*id, Duration::from_secs(1)));
            let clock = Arc::new(ManualClock::new(10_000 * i as i64, 3));
            let node = Arc::new(Node::new(config, transport, clock).expect("valid node"));
            network.register(*id, node.clone()).await;
            nodes.push(node);
        }
        Self { network, nodes }
    }

    /// One gossip pass on every node.
    pub async fn pass(&self) {
        for node in &self.nodes {
            node.gossip_pass().await.expect("gossip pass");
        }
    }

    /// Gossip until every node has ordered at least `min` events, or
    /// `max_passes` is reached. Returns the number of passes run.
    pub async fn run_until_ordered(&self, min: usize, max_passes: usize) -> usize {
        for passes in 0..max_passes {
            if self.orders().await.iter().all(|o| o.len() >= min) {
                return passes;
            }
            self.pass().await;
        }
        max_passes
    }

    /// Every node's consensus order.
    pub async fn orders(&self) -> Vec<Vec<EventId>> {
        let mut orders = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            orders.push(node.ordered_event_ids().await);
        }
        orders
    }

    /// Every node's snapshot.
    pub async fn snapshots(&self) -> Vec<NodeSnapshot> {
        let mut snapshots = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            snapshots.push(node.snapshot().await);
        }
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_ids_distinct_and_stable() {
        let a = peer_ids(5);
        assert_eq!(a, peer_ids(5));
        let set = PeerSet::new(a).unwrap();
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_dag_builder_laps_reach_rounds() {
        let mut dag = DagBuilder::new(4);
        for _ in 0..10 {
            dag.lap();
        }
        let graph = dag.finish();
        assert!(graph.max_round() >= 2);
        assert_eq!(graph.len(), 4 + 10 * 12);
    }

    #[test]
    fn test_random_syncs_deterministic() {
        let mut a = DagBuilder::new(4);
        let mut b = DagBuilder::new(4);
        a.random_syncs(7, 50);
        b.random_syncs(7, 50);
        assert_eq!(a.finish().ordered_ids(), b.finish().ordered_ids());
    }

    #[tokio::test]
    async fn test_network_orders() {
        let net = TestNetwork::new(4).await;
        net.run_until_ordered(1, 60).await;
        let orders = net.orders().await;
        assert!(orders.iter().all(|o| !o.is_empty()));
    }
}
