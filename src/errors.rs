//! Error types for the graph store, traversal, and resolver boundaries.
//!
//! The taxonomy follows one rule: every boundary operation returns a result
//! that distinguishes success, not-found, and failure. "Not found" is a
//! recovery signal (the caller rebuilds the graph), never something to log as
//! an error; I/O failures are fatal to an in-progress build but recoverable
//! for a reader; a traversal that walks off the graph before reaching its
//! declared start is reported as a distinct diagnostic instead of being
//! silently truncated.

use miette::Diagnostic;
use thiserror::Error;

use crate::workers::{WorkerCodecError, WorkerId};

/// Errors from the persistent graph store.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// The artifact is absent, unreadable, or carries the wrong version.
    ///
    /// Always a rebuild signal; a mismatched artifact is never partially
    /// trusted.
    #[error("graph artifact not usable: {reason}")]
    #[diagnostic(
        code(tracegraph::store::not_found),
        help("Rebuild the graph from the original trace; mismatched artifacts are discarded wholesale.")
    )]
    NotFound {
        /// Why the artifact was rejected (absent, bad magic, version skew, ...).
        reason: String,
    },

    /// Read or write failure against the backing storage.
    ///
    /// Fatal to a building graph (discard the instance and retry the whole
    /// construction); recoverable for queries against a sealed graph.
    #[error("graph store I/O failure")]
    #[diagnostic(code(tracegraph::store::io))]
    Io(#[from] std::io::Error),

    /// A sealed artifact's payload is malformed past the header.
    ///
    /// Distinct from [`NotFound`](Self::NotFound): the header matched, so the
    /// artifact claimed to be ours, but a query ran into garbage.
    #[error("graph artifact is corrupt: {detail}")]
    #[diagnostic(code(tracegraph::store::corrupt))]
    Corrupt {
        /// What the reader stumbled over.
        detail: String,
    },

    /// Vertices for one worker must be appended in strictly increasing
    /// timestamp order; re-sorting would defeat the append-only layout.
    #[error("out-of-order append for {worker}: {next} after {prev}")]
    #[diagnostic(
        code(tracegraph::store::out_of_order),
        help("The construction driver must feed each worker's events in timestamp order.")
    )]
    OutOfOrder {
        /// Worker whose timeline was violated.
        worker: WorkerId,
        /// Timestamp of the previously appended vertex.
        prev: i64,
        /// Offending timestamp.
        next: i64,
    },

    /// An edge append referenced vertices that are not the current tail of
    /// their worker's timeline.
    #[error("invalid edge append: {detail}")]
    #[diagnostic(code(tracegraph::store::invalid_edge))]
    InvalidEdge {
        /// Which constraint was violated.
        detail: String,
    },

    /// A worker id that this graph never assigned.
    #[error("unknown worker {worker}")]
    #[diagnostic(code(tracegraph::store::unknown_worker))]
    UnknownWorker {
        /// The unassigned id.
        worker: WorkerId,
    },

    /// Worker identity could not be encoded or decoded for the worker table.
    #[error(transparent)]
    #[diagnostic(transparent)]
    WorkerCodec(#[from] WorkerCodecError),
}

impl StoreError {
    /// Convenience constructor for [`StoreError::NotFound`].
    pub fn not_found(reason: impl Into<String>) -> Self {
        StoreError::NotFound {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for [`StoreError::Corrupt`].
    pub fn corrupt(detail: impl Into<String>) -> Self {
        StoreError::Corrupt {
            detail: detail.into(),
        }
    }

    /// True for the rebuild signal, as opposed to a genuine failure.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Errors from the critical-path backward traversal.
#[derive(Debug, Error, Diagnostic)]
pub enum CriticalPathError {
    /// The walk reached the graph boundary before the declared start vertex.
    ///
    /// Indicates a malformed graph or a (start, end) pair that is not actually
    /// connected; never reported as a silently shortened path.
    #[error(
        "backward traversal hit the graph boundary at {worker}@{reached} before reaching start @{start}"
    )]
    #[diagnostic(
        code(tracegraph::critical_path::inconsistent_traversal),
        help("Check that start and end lie on the same worker chain or are connected via link edges.")
    )]
    InconsistentTraversal {
        /// Requested start timestamp.
        start: i64,
        /// Worker on which the walk ran out of edges.
        worker: WorkerId,
        /// Timestamp of the boundary vertex that was reached instead.
        reached: i64,
    },

    /// One of the requested endpoints does not exist in the sealed graph.
    #[error("no vertex for {worker} at {timestamp}")]
    #[diagnostic(code(tracegraph::critical_path::vertex_not_found))]
    VertexNotFound {
        /// Worker of the missing vertex.
        worker: WorkerId,
        /// Timestamp that matched no vertex exactly.
        timestamp: i64,
    },

    /// The underlying store failed while the traversal was reading.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the multi-graph resolver.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// `resolve` was called with no path segments at all.
    #[error("no path segments to resolve")]
    #[diagnostic(code(tracegraph::resolver::empty_input))]
    EmptyInput,

    /// The host segment index does not point into the supplied segments.
    #[error("host segment index {index} out of range for {len} segments")]
    #[diagnostic(code(tracegraph::resolver::host_out_of_range))]
    HostOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of segments supplied.
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinguishable_from_io() {
        let nf = StoreError::not_found("version mismatch");
        assert!(nf.is_not_found());
        let io = StoreError::Io(std::io::Error::other("disk on fire"));
        assert!(!io.is_not_found());
    }
}
