//! Shared builders for integration tests: small sealed graphs described as
//! literal chains and links.

use std::path::Path;
use std::sync::Arc;

use tracegraph::context::os::OsContextStateFactory;
use tracegraph::context::{ContextKind, EdgeContextState};
use tracegraph::critical_path::CriticalPath;
use tracegraph::graph::{GraphBuilder, SealedGraph, Vertex};
use tracegraph::workers::JsonWorkerSerializer;

/// Artifact format revision used by every test graph.
pub const VERSION: u32 = 1;

/// Window start used by every test graph.
pub const START_TIME: i64 = 0;

/// One worker's chain: name, vertex timestamps, and the context kind of each
/// edge between consecutive vertices (`None` leaves a hole in the chain).
pub struct Chain {
    pub worker: &'static str,
    pub timestamps: &'static [i64],
    pub kinds: &'static [Option<ContextKind>],
}

/// A cross-worker link: (worker, timestamp) endpoints plus a kind.
pub struct Link {
    pub from: (&'static str, i64),
    pub to: (&'static str, i64),
    pub kind: ContextKind,
}

/// OS-numbering state for a kind.
pub fn os_state(kind: ContextKind) -> EdgeContextState {
    OsContextStateFactory::state_for(kind)
}

/// Build and seal a graph from literal chains and links.
///
/// Edge kind slices must be exactly one shorter than their timestamp slices.
pub fn build_sealed(path: &Path, chains: &[Chain], links: &[Link]) -> SealedGraph<String> {
    let mut builder = GraphBuilder::create(
        path,
        VERSION,
        START_TIME,
        JsonWorkerSerializer,
        Arc::new(OsContextStateFactory),
    )
    .expect("create builder");

    for chain in chains {
        assert_eq!(
            chain.kinds.len() + 1,
            chain.timestamps.len(),
            "chain for {} is malformed",
            chain.worker
        );
        let worker = chain.worker.to_string();
        let mut prev: Option<Vertex> = None;
        for (i, &ts) in chain.timestamps.iter().enumerate() {
            let vertex = builder.append_vertex(&worker, ts).expect("append vertex");
            if let (Some(from), Some(Some(kind))) = (prev, i.checked_sub(1).map(|k| &chain.kinds[k]))
            {
                builder
                    .append_edge(from, vertex, &os_state(kind.clone()))
                    .expect("append edge");
            }
            prev = Some(vertex);
        }
    }

    for link in links {
        let from = vertex_of(&builder, link.from);
        let to = vertex_of(&builder, link.to);
        builder
            .append_link(from, to, &os_state(link.kind.clone()))
            .expect("append link");
    }

    builder.seal().expect("seal graph")
}

fn vertex_of(
    builder: &GraphBuilder<String, JsonWorkerSerializer>,
    (worker, ts): (&str, i64),
) -> Vertex {
    let id = builder
        .registry()
        .lookup(&worker.to_string())
        .expect("worker registered before links");
    Vertex::new(id, ts)
}

/// Assert the path covers `[start_ts, end_ts]` with no temporal gaps.
pub fn assert_gap_free(path: &CriticalPath, start_ts: i64, end_ts: i64) {
    if start_ts == end_ts {
        assert!(path.is_empty(), "zero-length span must be an empty path");
        return;
    }
    let edges = path.edges();
    assert!(!edges.is_empty(), "non-empty span produced an empty path");
    assert_eq!(edges.first().unwrap().from.timestamp, start_ts);
    assert_eq!(edges.last().unwrap().to.timestamp, end_ts);
    for pair in edges.windows(2) {
        assert_eq!(
            pair[0].to.timestamp, pair[1].from.timestamp,
            "gap between {} and {}",
            pair[0], pair[1]
        );
    }
}
