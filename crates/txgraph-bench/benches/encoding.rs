use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use txgraph_bench::fixtures;
use txgraph_core::DiscoveredWalletSet;
use txgraph_graph::{EncodingConfig, GraphDataAdapter, ResolvedStyles};

fn bench_resolve_styles(c: &mut Criterion) {
    let snapshot = fixtures::hub_and_spoke(10, 49);
    let discovered: DiscoveredWalletSet = (0..500)
        .step_by(7)
        .map(fixtures::wallet_id)
        .collect();
    let config = EncodingConfig::default();

    c.bench_function("resolve_styles_500_nodes", |b| {
        b.iter(|| black_box(ResolvedStyles::resolve(&snapshot, &discovered, &config)))
    });
}

fn bench_adapt_payload(c: &mut Criterion) {
    let payload = fixtures::hub_and_spoke_payload(10, 49);
    let adapter = GraphDataAdapter::default();

    c.bench_function("adapt_payload_500_nodes", |b| {
        b.iter(|| black_box(adapter.adapt_value(black_box(&payload), None)))
    });
}

criterion_group!(benches, bench_resolve_styles, bench_adapt_payload);
criterion_main!(benches);
