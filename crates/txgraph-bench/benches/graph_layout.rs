use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use txgraph_bench::fixtures;
use txgraph_core::RequestId;
use txgraph_graph::{
    LayoutConfig, LayoutEngine, LayoutJob, LayoutRequest, LayoutStrategyKind,
};

fn bench_layout_strategies(c: &mut Criterion) {
    // 10 exchanges with 29 counterparties each: 300 nodes.
    let snapshot = fixtures::hub_and_spoke(10, 29);
    let mut group = c.benchmark_group("layout_300_nodes");
    group.sample_size(20);

    for kind in [
        LayoutStrategyKind::Grid,
        LayoutStrategyKind::Hierarchical,
        LayoutStrategyKind::ForceDirected,
    ] {
        let engine = LayoutEngine::new(LayoutConfig {
            strategy: kind,
            ..Default::default()
        });
        group.bench_with_input(
            BenchmarkId::from_parameter(engine.strategy_name()),
            &snapshot,
            |b, snapshot| {
                b.iter(|| {
                    let job =
                        LayoutJob::new(RequestId(1), LayoutRequest::new(snapshot.clone()));
                    black_box(engine.compute_blocking(&job).map(|r| r.positions.len()))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_layout_strategies);
criterion_main!(benches);
