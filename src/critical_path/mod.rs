//! Backward greedy critical-path traversal over one sealed graph.
//!
//! The critical path lower-bounds the end-to-end latency between two vertices:
//! it is the chain of intervals during which the worker (or a worker it was
//! waiting on) could not make progress. The algorithm walks *backward* from
//! the end vertex, because the question it answers is "what could not have
//! been shortened without changing the end time":
//!
//! - `Pass` edges mean the worker was actively progressing; they are crossed
//!   transparently and the bottleneck is sought further back.
//! - `Stop` edges are retained: the worker was stalled.
//! - `Unknown` edges are retained conservatively; absence of information is
//!   never read as progress.
//! - At a vertex offering both a chain edge and incoming link edges, a
//!   *matchable* `Stop`/`Unknown` link wins: a wait attributable to another
//!   worker is a stronger causal explanation of the stall than an untyped
//!   local edge. Following it moves the walk onto that worker's chain.
//!
//! The walk terminates at the start vertex, at an `Eps` (synthetic
//! lifeline-start) edge, or at the graph boundary; reaching the boundary
//! before the start is a reportable inconsistency, never a silently shortened
//! path. Intervals the walk has no information for are filled with
//! synthesized `Unknown` edges, so the produced path covers `[start, end]`
//! with no temporal gaps.
//!
//! For a fixed sealed graph and (start, end) pair the algorithm is a pure
//! function: every run yields an identical path. That is what makes results
//! cacheable by the embedder.

use std::fmt;

use tracing::instrument;

use crate::context::EdgeContextState;
use crate::control::Cancellation;
use crate::errors::CriticalPathError;
use crate::graph::{SealedGraph, Vertex};
use crate::workers::GraphWorker;

/// One edge of a critical path.
///
/// Unlike a chain edge, a path edge may span workers (when the walk followed
/// a link edge), so both endpoints are full vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct PathEdge {
    /// Earlier endpoint.
    pub from: Vertex,
    /// Later endpoint.
    pub to: Vertex,
    /// Execution context of the interval.
    pub state: EdgeContextState,
    /// True for filler edges synthesized to keep the path gap-free; false
    /// for edges retained from the graph.
    pub synthesized: bool,
}

impl PathEdge {
    /// Edge duration in nanoseconds.
    #[must_use]
    pub fn duration(&self) -> i64 {
        self.to.timestamp - self.from.timestamp
    }
}

impl fmt::Display for PathEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} [{}]", self.from, self.to, self.state)
    }
}

/// An ordered, gap-free sequence of path edges from a start vertex to an end
/// vertex.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CriticalPath {
    edges: Vec<PathEdge>,
    complete: bool,
}

impl CriticalPath {
    pub(crate) fn new(edges: Vec<PathEdge>, complete: bool) -> Self {
        debug_assert!(
            edges
                .windows(2)
                .all(|w| w[0].to.timestamp == w[1].from.timestamp),
            "critical path must be temporally contiguous"
        );
        CriticalPath { edges, complete }
    }

    /// The path edges, earliest first.
    #[must_use]
    pub fn edges(&self) -> &[PathEdge] {
        &self.edges
    }

    /// False only when the traversal was cancelled and the path covers just
    /// the portion walked so far.
    #[must_use]
    pub fn complete(&self) -> bool {
        self.complete
    }

    /// Number of edges, fillers included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True for a path with no edges (start == end, or cancelled at once).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Earliest vertex covered.
    #[must_use]
    pub fn start(&self) -> Option<Vertex> {
        self.edges.first().map(|e| e.from)
    }

    /// Latest vertex covered.
    #[must_use]
    pub fn end(&self) -> Option<Vertex> {
        self.edges.last().map(|e| e.to)
    }

    /// Iterate over the edges, earliest first.
    pub fn iter(&self) -> std::slice::Iter<'_, PathEdge> {
        self.edges.iter()
    }

    /// The retained (non-filler) edges: the actual critical segments.
    pub fn critical_segments(&self) -> impl Iterator<Item = &PathEdge> {
        self.edges.iter().filter(|e| !e.synthesized)
    }
}

impl<'a> IntoIterator for &'a CriticalPath {
    type Item = &'a PathEdge;
    type IntoIter = std::slice::Iter<'a, PathEdge>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// How the backward walk ended.
enum Stopped {
    /// Reached the start vertex (or an Eps edge standing in for it).
    AtStart,
    /// Cancelled mid-walk at the given cursor.
    Cancelled(Vertex),
}

/// Backward greedy critical-path computation against one sealed graph.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tracegraph::context::os::OsContextStateFactory;
/// use tracegraph::critical_path::CriticalPathAlgorithm;
/// use tracegraph::graph::{SealedGraph, Vertex};
/// use tracegraph::workers::{JsonWorkerSerializer, WorkerId};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let graph: SealedGraph<String> = SealedGraph::open(
///     "window-0.tg".as_ref(),
///     1,
///     0,
///     &JsonWorkerSerializer,
///     Arc::new(OsContextStateFactory),
/// )?;
/// let worker = WorkerId::new(0);
/// let path = CriticalPathAlgorithm::new(&graph)
///     .compute(Vertex::new(worker, 0), Vertex::new(worker, 30))?;
/// for edge in path.critical_segments() {
///     println!("{edge}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct CriticalPathAlgorithm<'g, W> {
    graph: &'g SealedGraph<W>,
    cancellation: Option<Cancellation>,
}

impl<'g, W: GraphWorker> CriticalPathAlgorithm<'g, W> {
    /// Bind the algorithm to a sealed graph.
    #[must_use]
    pub fn new(graph: &'g SealedGraph<W>) -> Self {
        CriticalPathAlgorithm {
            graph,
            cancellation: None,
        }
    }

    /// Attach a cancellation token, checked at vertex granularity.
    #[must_use]
    pub fn with_cancellation(mut self, token: Cancellation) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Compute the critical path from `start` to `end`.
    ///
    /// Both endpoints must be existing vertices; `end` must not precede
    /// `start`. On cancellation the result covers the walked portion and is
    /// flagged incomplete.
    #[instrument(skip(self), err)]
    pub fn compute(&self, start: Vertex, end: Vertex) -> Result<CriticalPath, CriticalPathError> {
        for endpoint in [start, end] {
            if self
                .graph
                .vertex_at(endpoint.worker, endpoint.timestamp)?
                .is_none()
            {
                return Err(CriticalPathError::VertexNotFound {
                    worker: endpoint.worker,
                    timestamp: endpoint.timestamp,
                });
            }
        }
        if start == end {
            return Ok(CriticalPath::new(Vec::new(), true));
        }

        let (mut retained, stopped) = self.walk_backward(start, end)?;
        retained.reverse();

        let (fill_from, complete) = match stopped {
            Stopped::AtStart => (start, true),
            Stopped::Cancelled(cursor) => (cursor, false),
        };

        let path = assemble(fill_from, end, retained, complete);
        tracing::debug!(
            edges = path.len(),
            complete = path.complete(),
            "critical path computed"
        );
        Ok(path)
    }

    /// Collect retained edges from `end` back toward `start`, newest first.
    fn walk_backward(
        &self,
        start: Vertex,
        end: Vertex,
    ) -> Result<(Vec<PathEdge>, Stopped), CriticalPathError> {
        let mut retained = Vec::new();
        let mut cursor = end;
        loop {
            if cursor == start {
                return Ok((retained, Stopped::AtStart));
            }
            if cursor.worker == start.worker && cursor.timestamp < start.timestamp {
                // Walked past the declared start without landing on it.
                return Err(CriticalPathError::InconsistentTraversal {
                    start: start.timestamp,
                    worker: cursor.worker,
                    reached: cursor.timestamp,
                });
            }
            if let Some(token) = &self.cancellation
                && token.is_cancelled()
            {
                return Ok((retained, Stopped::Cancelled(cursor)));
            }

            // Tie-break: a matchable Stop/Unknown link beats the chain edge.
            // Zero-length links cannot move the walk backward and are skipped.
            let link = self
                .graph
                .links_into(cursor)
                .into_iter()
                .filter(|l| {
                    l.state.matchable()
                        && l.state.class().is_retained()
                        && l.from.timestamp < cursor.timestamp
                })
                .max_by_key(|l| (l.from.timestamp, l.from.worker));
            if let Some(link) = link {
                let source = link.from;
                retained.push(PathEdge {
                    from: link.from,
                    to: link.to,
                    state: link.state,
                    synthesized: false,
                });
                cursor = source;
                continue;
            }

            let around = self.graph.edges_around(cursor.worker, cursor.timestamp)?;
            let Some(edge) = around
                .incoming
                .filter(|_| around.vertex == Some(cursor))
            else {
                // Graph boundary before the start vertex.
                return Err(CriticalPathError::InconsistentTraversal {
                    start: start.timestamp,
                    worker: cursor.worker,
                    reached: cursor.timestamp,
                });
            };

            if edge.state.kind().is_eps() {
                // Synthetic lifeline start; nothing older to learn.
                return Ok((retained, Stopped::AtStart));
            }
            let source = edge.source();
            if edge.state.class().is_retained() {
                retained.push(PathEdge {
                    from: source,
                    to: edge.destination(),
                    state: edge.state,
                    synthesized: false,
                });
            }
            cursor = source;
        }
    }
}

/// Forward assembly: interleave retained edges with synthesized fillers so
/// the result covers `[fill_from, end]` contiguously.
fn assemble(fill_from: Vertex, end: Vertex, retained: Vec<PathEdge>, complete: bool) -> CriticalPath {
    let mut edges = Vec::with_capacity(retained.len() * 2 + 1);
    let mut cursor = fill_from;
    for edge in retained {
        if edge.from.timestamp > cursor.timestamp {
            edges.push(filler(
                Vertex::new(edge.from.worker, cursor.timestamp),
                edge.from,
            ));
        }
        cursor = edge.to;
        edges.push(edge);
    }
    if end.timestamp > cursor.timestamp {
        edges.push(filler(Vertex::new(end.worker, cursor.timestamp), end));
    }
    CriticalPath::new(edges, complete)
}

fn filler(from: Vertex, to: Vertex) -> PathEdge {
    PathEdge {
        from,
        to,
        state: EdgeContextState::synthetic_unknown(),
        synthesized: true,
    }
}
