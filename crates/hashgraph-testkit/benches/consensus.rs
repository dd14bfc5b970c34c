//! Consensus throughput over synthetic gossip.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use hashgraph_consensus::ConsensusConfig;
use hashgraph_testkit::generators::{all_events, replay};
use hashgraph_testkit::DagBuilder;

fn bench_build_and_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_and_order");
    for peers in [4usize, 7, 10] {
        group.bench_with_input(BenchmarkId::from_parameter(peers), &peers, |b, &n| {
            b.iter(|| {
                let mut dag = DagBuilder::new(n);
                for _ in 0..8 {
                    dag.lap();
                }
                black_box(dag.finish().ordered_ids().len())
            })
        });
    }
    group.finish();
}

fn bench_replay(c: &mut Criterion) {
    let mut dag = DagBuilder::with_config(4, ConsensusConfig::default());
    dag.random_syncs(42, 400);
    let live = dag.finish();
    let events = all_events(&live);

    c.bench_function("replay_400_random_syncs", |b| {
        b.iter(|| black_box(replay(&live, events.clone()).ordered_ids().len()))
    });
}

criterion_group!(benches, bench_build_and_order, bench_replay);
criterion_main!(benches);
