//! Multi-node scenarios over the in-memory network.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use hashgraph_sync::verify_all;
use hashgraph_testkit::TestNetwork;

#[tokio::test]
async fn test_random_pass_order_stays_consistent() {
    let net = TestNetwork::new(5).await;
    let mut rng = StdRng::seed_from_u64(11);

    for round in 0..40 {
        let mut order: Vec<usize> = (0..net.nodes.len()).collect();
        order.shuffle(&mut rng);
        for i in order {
            net.nodes[i]
                .submit_transaction(format!("r{round}-n{i}").into_bytes())
                .await
                .unwrap();
            net.nodes[i].gossip_pass().await.unwrap();
        }
    }

    let orders = net.orders().await;
    assert!(orders.iter().all(|o| !o.is_empty()));
    for result in verify_all(&orders) {
        assert!(result.is_consistent(), "{result:?}");
    }
}

#[tokio::test]
async fn test_partition_heals() {
    let net = TestNetwork::new(4).await;
    let isolated = net.nodes[0].id();
    net.network.disconnect(isolated).await;

    for _ in 0..5 {
        for node in &net.nodes {
            let report = node.gossip_pass().await.unwrap();
            if node.id() == isolated {
                assert!(report.synced.is_empty());
            } else {
                assert_eq!(report.failed.len(), 1);
            }
        }
    }
    assert!(net.orders().await.iter().all(Vec::is_empty));

    net.network.reconnect(isolated).await;
    let passes = net.run_until_ordered(1, 80).await;
    assert!(passes < 80, "network never ordered after healing");

    let snapshots = net.snapshots().await;
    assert!(snapshots.iter().all(|s| s.faulty.is_empty()));
    for result in verify_all(&net.orders().await) {
        assert!(result.is_consistent());
    }
}
