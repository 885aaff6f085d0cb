//! Execution graphs: building-state construction and sealed-state queries.
//!
//! A graph models the lifelines of a set of workers over one bounded time
//! window. Each worker's lifeline is a simple chain of timestamped vertices;
//! chain edges connect consecutive vertices and carry an
//! [`EdgeContextState`](crate::context::EdgeContextState); link edges connect
//! vertices of *different* workers and are what the multi-graph resolver
//! matches on.
//!
//! The lifecycle is a one-way street with a compile-time seam, the same shape
//! as a builder that compiles into an immutable application:
//!
//! 1. [`GraphBuilder::create`] opens a building-state graph backed by an
//!    append log. Exactly one writer appends vertices, edges, and links.
//! 2. [`GraphBuilder::seal`] replays the log into the final artifact and
//!    yields a [`SealedGraph`].
//! 3. A [`SealedGraph`] is immutable and `Send + Sync`; any number of threads
//!    may query it concurrently, or reopen it later with
//!    [`SealedGraph::open`].
//!
//! There is no way to query a building graph or append to a sealed one; the
//! two states are separate types.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use tracegraph::context::ContextKind;
//! use tracegraph::context::os::OsContextStateFactory;
//! use tracegraph::graph::GraphBuilder;
//! use tracegraph::workers::JsonWorkerSerializer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("window-0.tg");
//!
//! let mut builder = GraphBuilder::create(
//!     &path,
//!     1,
//!     0,
//!     JsonWorkerSerializer,
//!     Arc::new(OsContextStateFactory),
//! )?;
//!
//! let tid = "host0/tid:7".to_string();
//! let v0 = builder.append_vertex(&tid, 0)?;
//! let v1 = builder.append_vertex(&tid, 10)?;
//! builder.append_edge(v0, v1, &OsContextStateFactory::state_for(ContextKind::Running))?;
//!
//! let sealed = builder.seal()?;
//! assert_eq!(sealed.all_workers().len(), 1);
//! # Ok(())
//! # }
//! ```

mod builder;
mod sealed;

pub use builder::{GraphBuilder, create_graph_instance};
pub use sealed::{EdgesAround, SealedGraph, VertexIter};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::EdgeContextState;
use crate::workers::WorkerId;

/// A timestamped point on one worker's lifeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vertex {
    /// Owning worker.
    pub worker: WorkerId,
    /// Nanosecond timestamp; strictly increasing along one worker's chain.
    pub timestamp: i64,
}

impl Vertex {
    /// Convenience constructor.
    #[must_use]
    pub const fn new(worker: WorkerId, timestamp: i64) -> Self {
        Vertex { worker, timestamp }
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.worker, self.timestamp)
    }
}

/// An interval between two consecutive vertices on one worker's chain.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainEdge {
    /// Worker whose timeline this edge belongs to.
    pub worker: WorkerId,
    /// Timestamp of the source vertex.
    pub from_ts: i64,
    /// Timestamp of the destination vertex.
    pub to_ts: i64,
    /// Execution context during the interval.
    pub state: EdgeContextState,
}

impl ChainEdge {
    /// The source vertex.
    #[must_use]
    pub fn source(&self) -> Vertex {
        Vertex::new(self.worker, self.from_ts)
    }

    /// The destination vertex.
    #[must_use]
    pub fn destination(&self) -> Vertex {
        Vertex::new(self.worker, self.to_ts)
    }

    /// Edge duration in nanoseconds; never negative in a well-formed graph.
    #[must_use]
    pub fn duration(&self) -> i64 {
        self.to_ts - self.from_ts
    }
}

/// A cross-worker edge, used for matching across workers and graphs.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkEdge {
    /// Source vertex, on the sending worker.
    pub from: Vertex,
    /// Destination vertex, on the receiving worker.
    pub to: Vertex,
    /// Execution context of the link.
    pub state: EdgeContextState,
}

impl LinkEdge {
    /// Edge duration in nanoseconds.
    #[must_use]
    pub fn duration(&self) -> i64 {
        self.to.timestamp - self.from.timestamp
    }
}
