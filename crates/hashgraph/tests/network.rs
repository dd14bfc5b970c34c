//! Multi-node gossip over the in-memory network.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hashgraph::consensus::strongly_sees;
use hashgraph::store::{Store, StoreExt};
use hashgraph::sync::{verify_all, MemoryNetwork};
use hashgraph::{Event, Hashgraph, ManualClock, Node, NodeConfig, PeerId};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Cluster {
    network: Arc<MemoryNetwork>,
    nodes: Vec<Arc<Node>>,
}

impl Cluster {
    async fn new(n: usize) -> anyhow::Result<Self> {
        let ids: Vec<PeerId> = (0..n).map(|i| PeerId::derive(&format!("node-{i}"))).collect();
        let network = MemoryNetwork::new();
        let mut nodes = Vec::new();
        for (i, id) in ids.iter().enumerate() {
            let config = NodeConfig::new(*id, ids.clone());
            let transport = Arc::new(network.transport(*id, Duration::from_secs(1)));
            let clock = Arc::new(ManualClock::new(1_000 * i as i64, 7));
            let node = Arc::new(Node::new(config, transport, clock)?);
            network.register(*id, node.clone()).await;
            nodes.push(node);
        }
        Ok(Self { network, nodes })
    }

    /// One gossip pass on every node, in node order.
    async fn pass(&self) -> anyhow::Result<()> {
        for node in &self.nodes {
            node.gossip_pass().await?;
        }
        Ok(())
    }

    async fn orders(&self) -> Vec<Vec<hashgraph::EventId>> {
        let mut orders = Vec::new();
        for node in &self.nodes {
            orders.push(node.ordered_event_ids().await);
        }
        orders
    }

    async fn min_ordered(&self) -> usize {
        self.orders().await.iter().map(Vec::len).min().unwrap_or(0)
    }
}

#[tokio::test]
async fn test_four_peers_agree_on_order() -> anyhow::Result<()> {
    init_tracing();
    let cluster = Cluster::new(4).await?;

    let mut submitted = Vec::new();
    for (i, node) in cluster.nodes.iter().enumerate() {
        for j in 0..3 {
            let tx = Bytes::from(format!("tx-{i}-{j}"));
            node.submit_transaction(tx.clone()).await?;
            submitted.push(tx);
        }
    }

    for _ in 0..60 {
        cluster.pass().await?;
        let all_ordered = {
            let ordered = cluster.nodes[0].ordered_transactions().await;
            submitted.iter().all(|tx| ordered.contains(tx))
        };
        if all_ordered && cluster.min_ordered().await > 0 {
            break;
        }
    }

    let orders = cluster.orders().await;
    assert!(orders.iter().all(|o| !o.is_empty()), "no events ordered");
    for result in verify_all(&orders) {
        assert!(result.is_consistent(), "{result:?}");
    }

    let ordered = cluster.nodes[0].ordered_transactions().await;
    for tx in &submitted {
        assert_eq!(ordered.iter().filter(|t| *t == tx).count(), 1, "{tx:?}");
    }
    Ok(())
}

#[tokio::test]
async fn test_four_peer_rounds_fame_and_replay() -> anyhow::Result<()> {
    init_tracing();
    let cluster = Cluster::new(4).await?;
    let observer = &cluster.nodes[0];

    for _ in 0..200 {
        cluster.pass().await?;
        if observer.snapshot().await.max_round >= 4 {
            break;
        }
    }
    assert!(observer.snapshot().await.max_round >= 4, "rounds stalled");

    let (events, ordered) = observer
        .with_hashgraph(|graph| -> anyhow::Result<(Vec<Event>, Vec<hashgraph::EventId>)> {
            let store = graph.store();
            let round_one = graph.witnesses(1);
            assert_eq!(round_one.len(), 4);

            // With four peers every round-1 witness must be strongly seen
            // before an event moves up to round 2.
            let round_two = graph.witnesses(2);
            assert!(!round_two.is_empty());
            for a in &round_two {
                let a = store.handle_of(a)?;
                for b in &round_one {
                    let b = store.handle_of(b)?;
                    assert!(strongly_sees(store, graph.peers(), a, b));
                }
            }

            for id in &round_one {
                assert!(graph.get(id)?.fame.is_decided(), "{id} undecided");
            }
            assert!(graph.last_decided_round() >= Some(1));

            let events = store.handles().map(|h| store.event(h).clone()).collect();
            Ok((events, graph.ordered_ids()))
        })
        .await?;
    assert!(!ordered.is_empty());

    // Newest first, so nearly every event waits for its parents.
    let peers = observer.config().peer_set()?;
    let mut replayed: Hashgraph = Hashgraph::new(peers, observer.config().consensus.clone())?;
    let mut remaining: Vec<Event> = events.into_iter().rev().collect();
    while !remaining.is_empty() {
        let before = remaining.len();
        let mut retry = Vec::new();
        for event in remaining {
            match replayed.insert(event.clone()) {
                Ok(_) => {}
                Err(e) if e.is_retryable() => retry.push(event),
                Err(e) => return Err(e.into()),
            }
        }
        remaining = retry;
        assert!(remaining.len() < before, "replay made no progress");
    }
    replayed.run_consensus()?;
    assert_eq!(replayed.ordered_ids(), ordered);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_peer_is_skipped_then_catches_up() -> anyhow::Result<()> {
    init_tracing();
    let cluster = Cluster::new(4).await?;
    let offline = cluster.nodes[3].id();
    cluster.network.disconnect(offline).await;

    let report = cluster.nodes[0].gossip_pass().await?;
    assert_eq!(report.synced.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, offline);

    // Without the fourth peer no supermajority forms.
    for _ in 0..5 {
        for node in &cluster.nodes[..3] {
            node.gossip_pass().await?;
        }
    }
    assert_eq!(cluster.nodes[0].snapshot().await.max_round, 0);

    cluster.network.reconnect(offline).await;
    for _ in 0..60 {
        cluster.pass().await?;
        if cluster.min_ordered().await > 0 {
            break;
        }
    }

    let orders = cluster.orders().await;
    assert!(!orders[3].is_empty(), "reconnected peer never ordered");
    for result in verify_all(&orders) {
        assert!(result.is_consistent(), "{result:?}");
    }
    Ok(())
}

#[tokio::test]
async fn test_resyncing_is_idempotent() -> anyhow::Result<()> {
    init_tracing();
    let cluster = Cluster::new(3).await?;
    let (a, b) = (&cluster.nodes[0], &cluster.nodes[1]);

    let first = a.sync_from(&b.id()).await?;
    assert_eq!(first.merge.accepted.len(), 1);

    let before = a.snapshot().await;
    let second = a.sync_from(&b.id()).await?;
    assert_eq!(second.received, 0);
    assert!(second.merge.accepted.is_empty());

    // Nothing new arrived, but the sync itself is one more event.
    let after = a.snapshot().await;
    assert_eq!(after.events, before.events + 1);
    assert_eq!(after.peer_counts[&b.id()], before.peer_counts[&b.id()]);
    Ok(())
}

#[tokio::test]
async fn test_snapshots_match_after_quiescence() -> anyhow::Result<()> {
    init_tracing();
    let cluster = Cluster::new(4).await?;
    for _ in 0..30 {
        cluster.pass().await?;
    }

    let snapshots = {
        let mut s = Vec::new();
        for node in &cluster.nodes {
            s.push(node.snapshot().await);
        }
        s
    };
    for s in &snapshots {
        assert!(s.faulty.is_empty());
        assert_eq!(s.buffered_transactions, 0);
        assert!(s.last_decided_round.is_some());
    }

    let orders = cluster.orders().await;
    let shortest = orders.iter().map(Vec::len).min().unwrap_or(0);
    let prefixes: Vec<_> = orders.iter().map(|o| o[..shortest].to_vec()).collect();
    assert!(verify_all(&prefixes).iter().all(|r| r.is_converged()));
    Ok(())
}
