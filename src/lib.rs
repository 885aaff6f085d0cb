//! # Tracegraph: execution graphs and critical-path analysis
//!
//! Tracegraph builds and queries **execution graphs**: directed graphs whose
//! vertices are timestamped points on the lifeline of a *worker* (a thread,
//! process, or similar scheduling unit) and whose edges are intervals tagged
//! with the execution context the worker was in (running, blocked, waiting on
//! the network, ...). On top of a sealed graph it computes the **critical
//! path** (the chain of stalls that lower-bounds the end-to-end latency
//! between two vertices) and can join critical paths across graphs where
//! edges are matchable (e.g. a network send matched to the peer's receive).
//!
//! ## Core concepts
//!
//! - **Workers**: opaque identities mapped to dense [`workers::WorkerId`]s by
//!   a registry persisted inside each graph artifact
//! - **Edge contexts**: an open kind set classified into pass / stop /
//!   unknown for traversal, with wire codes isolated behind factories
//! - **Graph store**: append-once-then-sealed, disk-backed, versioned;
//!   point queries are logarithmic per worker
//! - **Critical path**: deterministic backward greedy traversal with gap-free
//!   output and cooperative cancellation
//! - **Resolver**: best-effort cross-graph splicing at matchable edges
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use tracegraph::context::ContextKind;
//! use tracegraph::context::os::OsContextStateFactory;
//! use tracegraph::critical_path::CriticalPathAlgorithm;
//! use tracegraph::graph::GraphBuilder;
//! use tracegraph::workers::JsonWorkerSerializer;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("window-0.tg");
//!
//! // Build: one worker, running 0..10, blocked 10..20, running 20..30.
//! let mut builder = GraphBuilder::create(
//!     &path,
//!     1,
//!     0,
//!     JsonWorkerSerializer,
//!     Arc::new(OsContextStateFactory),
//! )?;
//! let tid = "host0/tid:7".to_string();
//! let running = OsContextStateFactory::state_for(ContextKind::Running);
//! let blocked = OsContextStateFactory::state_for(ContextKind::Blocked);
//!
//! let v0 = builder.append_vertex(&tid, 0)?;
//! let v1 = builder.append_vertex(&tid, 10)?;
//! builder.append_edge(v0, v1, &running)?;
//! let v2 = builder.append_vertex(&tid, 20)?;
//! builder.append_edge(v1, v2, &blocked)?;
//! let v3 = builder.append_vertex(&tid, 30)?;
//! builder.append_edge(v2, v3, &running)?;
//!
//! // Seal, then query: the blocked interval is the sole critical segment.
//! let sealed = builder.seal()?;
//! let path = CriticalPathAlgorithm::new(&sealed).compute(v0, v3)?;
//! let critical: Vec<_> = path.critical_segments().collect();
//! assert_eq!(critical.len(), 1);
//! assert_eq!((critical[0].from.timestamp, critical[0].to.timestamp), (10, 20));
//! # Ok(())
//! # }
//! ```
//!
//! ## Lifecycle and concurrency
//!
//! Graph construction is single-writer: one thread appends vertices, edges,
//! and links, then calls [`graph::GraphBuilder::seal`]. The resulting
//! [`graph::SealedGraph`] is immutable and may be queried from any number of
//! threads without locking; that one-time seal barrier is what buys lock-free
//! reads. Long traversals take a [`control::Cancellation`] token and return
//! partial, incomplete-flagged results when cancelled.
//!
//! ## Module guide
//!
//! - [`workers`] - Worker identities, dense ids, and the persisted registry
//! - [`context`] - Execution-context kinds, traversal classes, factories
//! - [`graph`] - Building-state construction and sealed-state queries
//! - [`critical_path`] - Backward greedy critical-path traversal
//! - [`resolver`] - Cross-graph joining at matchable edges
//! - [`control`] - Cooperative cancellation
//! - [`errors`] - Error taxonomy for every boundary operation
//! - [`telemetry`] - Optional tracing-subscriber setup

pub mod context;
pub mod control;
pub mod critical_path;
pub mod errors;
pub mod graph;
pub mod resolver;
pub mod telemetry;
pub mod workers;

mod store;
