//! Persistent graph store: build, seal, reopen, gate, query.

mod common;

use std::sync::Arc;

use common::*;
use tracegraph::context::ContextKind;
use tracegraph::context::os::OsContextStateFactory;
use tracegraph::control::Cancellation;
use tracegraph::graph::{GraphBuilder, SealedGraph, Vertex, create_graph_instance};
use tracegraph::workers::{JsonWorkerSerializer, WorkerId};

fn reopen(path: &std::path::Path, version: u32) -> Result<SealedGraph<String>, tracegraph::errors::StoreError> {
    SealedGraph::open(
        path,
        version,
        START_TIME,
        &JsonWorkerSerializer,
        Arc::new(OsContextStateFactory),
    )
}

#[test]
fn seal_then_reopen_reproduces_workers_and_vertices() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.tg");
    let sealed = build_sealed(
        &path,
        &[
            Chain {
                worker: "alpha",
                timestamps: &[0, 10, 20],
                kinds: &[Some(ContextKind::Running), Some(ContextKind::Blocked)],
            },
            Chain {
                worker: "beta",
                timestamps: &[5, 15],
                kinds: &[Some(ContextKind::Running)],
            },
        ],
        &[],
    );
    let alpha = sealed.id_of(&"alpha".to_string()).unwrap();
    drop(sealed);

    let reopened = reopen(&path, VERSION).unwrap();
    // Same ids for the same workers after reopen.
    assert_eq!(reopened.id_of(&"alpha".to_string()), Some(alpha));
    assert_eq!(reopened.all_workers().len(), 2);

    let vertices: Vec<i64> = reopened
        .vertices_of(alpha)
        .unwrap()
        .map(|v| v.unwrap().timestamp)
        .collect();
    assert_eq!(vertices, vec![0, 10, 20]);
}

#[test]
fn open_missing_artifact_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = reopen(&dir.path().join("absent.tg"), VERSION).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn version_skew_is_not_found_never_a_partial_graph() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.tg");
    build_sealed(
        &path,
        &[Chain {
            worker: "alpha",
            timestamps: &[0, 10],
            kinds: &[Some(ContextKind::Running)],
        }],
        &[],
    );
    let err = reopen(&path, VERSION + 1).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn garbage_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.tg");
    std::fs::write(&path, b"definitely not a graph artifact").unwrap();
    let err = reopen(&path, VERSION).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn header_without_a_footer_offset_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.tg");
    // A plausible header that no seal ever writes: right magic, right
    // version, zero footer offset.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"TGRF");
    bytes.extend_from_slice(&VERSION.to_le_bytes());
    bytes.extend_from_slice(&START_TIME.to_le_bytes());
    bytes.extend_from_slice(&0u64.to_le_bytes());
    std::fs::write(&path, &bytes).unwrap();
    let err = reopen(&path, VERSION).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn out_of_order_appends_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = GraphBuilder::create(
        &dir.path().join("g.tg"),
        VERSION,
        START_TIME,
        JsonWorkerSerializer,
        Arc::new(OsContextStateFactory),
    )
    .unwrap();
    let w = "alpha".to_string();
    builder.append_vertex(&w, 10).unwrap();
    let err = builder.append_vertex(&w, 10).unwrap_err();
    assert!(matches!(
        err,
        tracegraph::errors::StoreError::OutOfOrder { prev: 10, next: 10, .. }
    ));
    // Other workers are unaffected by one worker's ordering.
    builder.append_vertex(&"beta".to_string(), 0).unwrap();
}

#[test]
fn edge_append_must_connect_the_chain_tail() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = GraphBuilder::create(
        &dir.path().join("g.tg"),
        VERSION,
        START_TIME,
        JsonWorkerSerializer,
        Arc::new(OsContextStateFactory),
    )
    .unwrap();
    let w = "alpha".to_string();
    let v0 = builder.append_vertex(&w, 0).unwrap();
    let v1 = builder.append_vertex(&w, 10).unwrap();
    let v2 = builder.append_vertex(&w, 20).unwrap();
    let running = os_state(ContextKind::Running);
    // v0 -> v1 is no longer the tail pair.
    assert!(builder.append_edge(v0, v1, &running).is_err());
    builder.append_edge(v1, v2, &running).unwrap();
    // A vertex owns at most one outgoing edge.
    assert!(builder.append_edge(v1, v2, &running).is_err());
}

#[test]
fn edges_around_resolves_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let sealed = build_sealed(
        &dir.path().join("g.tg"),
        &[Chain {
            worker: "alpha",
            timestamps: &[0, 10, 20, 30],
            kinds: &[
                Some(ContextKind::Running),
                Some(ContextKind::Blocked),
                Some(ContextKind::Running),
            ],
        }],
        &[],
    );
    let alpha = sealed.id_of(&"alpha".to_string()).unwrap();

    let around = sealed.edges_around(alpha, 20).unwrap();
    assert_eq!(around.vertex, Some(Vertex::new(alpha, 20)));
    let incoming = around.incoming.unwrap();
    assert_eq!((incoming.from_ts, incoming.to_ts), (10, 20));
    assert_eq!(incoming.state.kind(), &ContextKind::Blocked);
    let outgoing = around.outgoing.unwrap();
    assert_eq!((outgoing.from_ts, outgoing.to_ts), (20, 30));
    assert_eq!(outgoing.state.kind(), &ContextKind::Running);

    // Floor semantics for a mid-interval timestamp.
    let around = sealed.edges_around(alpha, 25).unwrap();
    assert_eq!(around.vertex, Some(Vertex::new(alpha, 20)));

    // Before the chain: nothing.
    let around = sealed.edges_around(alpha, -5).unwrap();
    assert!(around.vertex.is_none());

    // Boundary vertices have one missing side.
    assert!(sealed.edges_around(alpha, 0).unwrap().incoming.is_none());
    assert!(sealed.edges_around(alpha, 30).unwrap().outgoing.is_none());
}

#[test]
fn chain_holes_produce_no_edge() {
    let dir = tempfile::tempdir().unwrap();
    let sealed = build_sealed(
        &dir.path().join("g.tg"),
        &[Chain {
            worker: "alpha",
            timestamps: &[0, 10, 20],
            kinds: &[None, Some(ContextKind::Running)],
        }],
        &[],
    );
    let alpha = sealed.id_of(&"alpha".to_string()).unwrap();
    let around = sealed.edges_around(alpha, 10).unwrap();
    assert!(around.incoming.is_none(), "hole must not invent an edge");
    assert!(around.outgoing.is_some());
}

#[test]
fn links_are_persisted_and_queryable_from_both_ends() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.tg");
    let sealed = build_sealed(
        &path,
        &[
            Chain {
                worker: "alpha",
                timestamps: &[0, 5, 50],
                kinds: &[Some(ContextKind::Running), Some(ContextKind::Network)],
            },
            Chain {
                worker: "beta",
                timestamps: &[8, 12],
                kinds: &[Some(ContextKind::Network)],
            },
        ],
        &[Link {
            from: ("beta", 12),
            to: ("alpha", 50),
            kind: ContextKind::Network,
        }],
    );
    drop(sealed);

    let sealed = reopen(&path, VERSION).unwrap();
    let alpha = sealed.id_of(&"alpha".to_string()).unwrap();
    let beta = sealed.id_of(&"beta".to_string()).unwrap();

    let into = sealed.links_into(Vertex::new(alpha, 50));
    assert_eq!(into.len(), 1);
    assert_eq!(into[0].from, Vertex::new(beta, 12));
    assert_eq!(into[0].state.kind(), &ContextKind::Network);
    assert!(into[0].state.matchable());

    let from = sealed.links_from(Vertex::new(beta, 12));
    assert_eq!(from.len(), 1);
    assert_eq!(from[0].to, Vertex::new(alpha, 50));

    assert!(sealed.links_into(Vertex::new(alpha, 5)).is_empty());
}

#[test]
fn unknown_worker_queries_are_errors_not_panics() {
    let dir = tempfile::tempdir().unwrap();
    let sealed = build_sealed(
        &dir.path().join("g.tg"),
        &[Chain {
            worker: "alpha",
            timestamps: &[0, 10],
            kinds: &[Some(ContextKind::Running)],
        }],
        &[],
    );
    let bogus = WorkerId::new(99);
    assert!(sealed.vertices_of(bogus).is_err());
    assert!(sealed.edges_around(bogus, 0).is_err());
}

#[test]
fn vertex_iteration_honors_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let timestamps: Vec<i64> = (0..100).map(|i| i * 10).collect();
    let kinds: Vec<Option<ContextKind>> = vec![Some(ContextKind::Running); 99];
    let timestamps: &'static [i64] = timestamps.leak();
    let kinds: &'static [Option<ContextKind>] = kinds.leak();
    let sealed = build_sealed(
        &dir.path().join("g.tg"),
        &[Chain {
            worker: "alpha",
            timestamps,
            kinds,
        }],
        &[],
    );
    let alpha = sealed.id_of(&"alpha".to_string()).unwrap();

    let token = Cancellation::new();
    let mut iter = sealed
        .vertices_of(alpha)
        .unwrap()
        .with_cancellation(token.clone());
    let mut seen = 0;
    while let Some(vertex) = iter.next() {
        vertex.unwrap();
        seen += 1;
        if seen == 10 {
            token.cancel();
        }
    }
    assert_eq!(seen, 10);
    assert!(iter.cancelled());

    // Restartable: a fresh iterator sees everything.
    assert_eq!(sealed.vertices_of(alpha).unwrap().count(), 100);
}

#[test]
fn create_graph_instance_reports_failure_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let unwritable = dir.path().join("no/such/dir/g.tg");
    let instance = create_graph_instance::<String, _>(
        &unwritable,
        VERSION,
        START_TIME,
        JsonWorkerSerializer,
        Arc::new(OsContextStateFactory),
    );
    assert!(instance.is_none());

    let ok = create_graph_instance::<String, _>(
        &dir.path().join("g.tg"),
        VERSION,
        START_TIME,
        JsonWorkerSerializer,
        Arc::new(OsContextStateFactory),
    );
    assert!(ok.is_some());
}

#[test]
fn sealing_removes_the_sidecar_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("g.tg");
    let log = dir.path().join("g.tg.log");
    let mut builder = GraphBuilder::create(
        &path,
        VERSION,
        START_TIME,
        JsonWorkerSerializer,
        Arc::new(OsContextStateFactory),
    )
    .unwrap();
    builder.append_vertex(&"alpha".to_string(), 0).unwrap();
    assert!(log.exists());
    builder.seal().unwrap();
    assert!(!log.exists());
    assert!(path.exists());
}
