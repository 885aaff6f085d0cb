//! Cross-graph join of per-worker critical paths at matchable edges.
//!
//! A `Stop` edge that is *matchable* (a network wait, in the OS kind set)
//! has an identifiable other side: some worker in another graph was doing the
//! corresponding send or receive. The resolver replaces such an opaque stall
//! in a host path with the matched remote activity, turning "worker A waited
//! 45 units on the network" into "worker A handed off to worker B, which did
//! X, then handed back".
//!
//! The join is best-effort and never mandatory: an edge with no candidate
//! match stays in the path unchanged. Matching is restricted to edges both
//! flagged matchable, is symmetric in the supplied predicate, and resolves
//! ambiguity by nearest start timestamp.
//!
//! Candidates are searched among the supplied path segments only, within the
//! host edge's own interval expanded by [`ResolverConfig::slack_ns`]. The
//! search is speculative by nature; which graphs are worth searching is the
//! embedder's call, made by choosing what to pass in.

use std::sync::Arc;

use crate::context::{EdgeContextState, os};
use crate::critical_path::{CriticalPath, PathEdge};
use crate::errors::ResolveError;
use crate::graph::{SealedGraph, Vertex};
use crate::workers::GraphWorker;

/// Symmetric predicate deciding whether two matchable edges describe the two
/// sides of the same causal event.
pub type MatchPredicate = Arc<dyn Fn(&EdgeContextState, &EdgeContextState) -> bool + Send + Sync>;

/// Default predicate: both edges matchable and of the same kind.
#[must_use]
pub fn default_matcher() -> MatchPredicate {
    Arc::new(|a, b| a.matchable() && b.matchable() && a.kind() == b.kind())
}

/// Tunables for the candidate search.
#[derive(Clone, Copy, Debug, Default)]
pub struct ResolverConfig {
    /// Widens the search window beyond the host edge's own interval, to
    /// tolerate clock skew between the graphs. Zero by default.
    pub slack_ns: i64,
}

/// One per-graph critical path offered to the resolver.
#[derive(Clone, Copy)]
pub struct PathSegment<'a, W> {
    /// The sealed graph the path was computed on.
    pub graph: &'a SealedGraph<W>,
    /// The path itself.
    pub path: &'a CriticalPath,
}

/// Join the host segment's critical path with matching remote activity from
/// the other segments.
///
/// For every matchable retained edge of the host path, the nearest matching
/// candidate (per `matcher`, within the slack-widened window) is spliced in:
/// the overlapped part of the host edge is replaced by the remote segment's
/// path content over that interval, and the host edge's prefix and suffix are
/// kept, trimmed. Edges without a candidate are kept as they are.
pub fn resolve<W: GraphWorker>(
    segments: &[PathSegment<'_, W>],
    host_index: usize,
    matcher: &MatchPredicate,
    config: &ResolverConfig,
) -> Result<CriticalPath, ResolveError> {
    if segments.is_empty() {
        return Err(ResolveError::EmptyInput);
    }
    let host = segments
        .get(host_index)
        .ok_or(ResolveError::HostOutOfRange {
            index: host_index,
            len: segments.len(),
        })?;

    let mut edges = Vec::with_capacity(host.path.len());
    let mut complete = host.path.complete();
    for edge in host.path.edges() {
        if !is_joinable(edge) {
            edges.push(edge.clone());
            continue;
        }
        match find_candidate(segments, host_index, edge, matcher, config) {
            Some(found) => {
                tracing::debug!(
                    host = %host.graph.path().display(),
                    remote = %segments[found.segment].graph.path().display(),
                    from = found.overlap.0,
                    to = found.overlap.1,
                    "splicing matched edge"
                );
                complete &= segments[found.segment].path.complete();
                splice(edge, &segments[found.segment], found.overlap, &mut edges);
            }
            None => edges.push(edge.clone()),
        }
    }
    Ok(CriticalPath::new(edges, complete))
}

/// A host edge participates in matching only if it is a real (non-filler)
/// matchable stall.
fn is_joinable(edge: &PathEdge) -> bool {
    !edge.synthesized && edge.state.matchable() && edge.state.class().is_retained()
}

struct Candidate {
    segment: usize,
    /// Overlap interval, clamped to the host edge.
    overlap: (i64, i64),
}

fn find_candidate<W: GraphWorker>(
    segments: &[PathSegment<'_, W>],
    host_index: usize,
    host_edge: &PathEdge,
    matcher: &MatchPredicate,
    config: &ResolverConfig,
) -> Option<Candidate> {
    let window = (
        host_edge.from.timestamp - config.slack_ns,
        host_edge.to.timestamp + config.slack_ns,
    );
    let mut best: Option<(i64, usize, (i64, i64))> = None;
    for (index, segment) in segments.iter().enumerate() {
        if index == host_index {
            continue;
        }
        for cand in segment.path.edges() {
            if !is_joinable(cand)
                || !(matcher)(&host_edge.state, &cand.state)
                || cand.from.timestamp >= window.1
                || cand.to.timestamp <= window.0
            {
                continue;
            }
            let overlap = (
                cand.from.timestamp.max(host_edge.from.timestamp),
                cand.to.timestamp.min(host_edge.to.timestamp),
            );
            if overlap.0 >= overlap.1 {
                // Slack admitted it into the window, but there is no usable
                // overlap to splice over.
                continue;
            }
            let distance = (cand.from.timestamp - host_edge.from.timestamp).abs();
            // Nearest start wins; earlier segment breaks ties, keeping the
            // join deterministic.
            let better = match &best {
                Some((best_distance, ..)) => distance < *best_distance,
                None => true,
            };
            if better {
                best = Some((distance, index, overlap));
            }
        }
    }
    best.map(|(_, segment, overlap)| Candidate { segment, overlap })
}

/// Replace the overlapped middle of `host_edge` with the remote segment's
/// path content, keeping trimmed prefix and suffix.
fn splice<W: GraphWorker>(
    host_edge: &PathEdge,
    remote: &PathSegment<'_, W>,
    overlap: (i64, i64),
    out: &mut Vec<PathEdge>,
) {
    let (splice_start, splice_end) = overlap;
    if splice_start > host_edge.from.timestamp {
        out.push(PathEdge {
            from: host_edge.from,
            to: Vertex::new(host_edge.from.worker, splice_start),
            state: host_edge.state.clone(),
            synthesized: false,
        });
    }

    // Remote path content over the overlap, clipped, with unknown fillers
    // where the remote path has nothing.
    let mut cursor = splice_start;
    let mut filler_worker = host_edge.from.worker;
    for edge in remote.path.edges() {
        if edge.to.timestamp <= splice_start || edge.from.timestamp >= splice_end {
            continue;
        }
        let from_ts = edge.from.timestamp.max(splice_start);
        let to_ts = edge.to.timestamp.min(splice_end);
        if from_ts > cursor {
            out.push(PathEdge {
                from: Vertex::new(edge.from.worker, cursor),
                to: Vertex::new(edge.from.worker, from_ts),
                state: EdgeContextState::synthetic_unknown(),
                synthesized: true,
            });
        }
        out.push(PathEdge {
            from: Vertex::new(edge.from.worker, from_ts),
            to: Vertex::new(edge.to.worker, to_ts),
            state: edge.state.clone(),
            synthesized: edge.synthesized,
        });
        cursor = to_ts;
        filler_worker = edge.to.worker;
    }
    if cursor < splice_end {
        out.push(PathEdge {
            from: Vertex::new(filler_worker, cursor),
            to: Vertex::new(filler_worker, splice_end),
            state: EdgeContextState::synthetic_unknown(),
            synthesized: true,
        });
    }

    if splice_end < host_edge.to.timestamp {
        out.push(PathEdge {
            from: Vertex::new(host_edge.to.worker, splice_end),
            to: host_edge.to,
            state: host_edge.state.clone(),
            synthesized: false,
        });
    }
}

/// Predicate matching any two matchable network edges, the common case for
/// OS graphs.
#[must_use]
pub fn network_matcher() -> MatchPredicate {
    Arc::new(|a, b| {
        a.matchable()
            && b.matchable()
            && os::matchable(a.kind())
            && os::matchable(b.kind())
    })
}
