//! Benchmarks for sealing and traversing execution graphs.
//!
//! These benchmarks measure the performance of:
//! - Building and sealing a graph with one alternating-context chain
//! - Computing the critical path over sealed graphs of varying chain length

use std::path::Path;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tracegraph::context::ContextKind;
use tracegraph::context::os::OsContextStateFactory;
use tracegraph::critical_path::CriticalPathAlgorithm;
use tracegraph::graph::{GraphBuilder, SealedGraph, Vertex};
use tracegraph::workers::JsonWorkerSerializer;

const CHAIN_LENGTHS: &[usize] = &[256, 1024, 4096];

/// Seal one worker's chain of `vertices` vertices with edges alternating
/// between running and blocked contexts.
fn seal_alternating_chain(path: &Path, vertices: usize) -> SealedGraph<String> {
    let mut builder = GraphBuilder::create(
        path,
        1,
        0,
        JsonWorkerSerializer,
        Arc::new(OsContextStateFactory),
    )
    .expect("create builder");
    let worker = "bench-worker".to_string();
    let mut prev = builder.append_vertex(&worker, 0).expect("vertex");
    for i in 1..vertices {
        let next = builder
            .append_vertex(&worker, i as i64 * 10)
            .expect("vertex");
        let kind = if i % 2 == 0 {
            ContextKind::Running
        } else {
            ContextKind::Blocked
        };
        builder
            .append_edge(prev, next, &OsContextStateFactory::state_for(kind))
            .expect("edge");
        prev = next;
    }
    builder.seal().expect("seal")
}

fn seal_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("seal_graph");
    for &vertices in CHAIN_LENGTHS {
        group.throughput(Throughput::Elements(vertices as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(vertices),
            &vertices,
            |b, &size| {
                b.iter(|| {
                    let dir = tempfile::tempdir().expect("tempdir");
                    seal_alternating_chain(&dir.path().join("bench.tg"), size)
                });
            },
        );
    }
    group.finish();
}

fn compute_critical_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("critical_path_compute");
    for &vertices in CHAIN_LENGTHS {
        let dir = tempfile::tempdir().expect("tempdir");
        let sealed = seal_alternating_chain(&dir.path().join("bench.tg"), vertices);
        let worker = sealed.id_of(&"bench-worker".to_string()).expect("worker id");
        let start = Vertex::new(worker, 0);
        let end = Vertex::new(worker, (vertices as i64 - 1) * 10);

        group.throughput(Throughput::Elements(vertices as u64));
        group.bench_with_input(BenchmarkId::from_parameter(vertices), &vertices, |b, _| {
            b.iter(|| {
                CriticalPathAlgorithm::new(&sealed)
                    .compute(start, end)
                    .expect("compute")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, seal_graph, compute_critical_path);
criterion_main!(benches);
