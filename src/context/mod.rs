//! Edge execution-context model: kinds, traversal classes, and wire codes.
//!
//! Every edge in an execution graph carries an [`EdgeContextState`] describing
//! what its worker was doing during that interval (running, blocked, waiting
//! on the network, ...). The critical-path algorithm never looks at the
//! domain-specific kind directly; it consumes two derived facts carried as
//! plain data:
//!
//! - the [`TraversalClass`]: whether the edge is transparent to the backward
//!   walk (`Pass`), retained as critical (`Stop`), or retained conservatively
//!   (`Unknown`);
//! - the `matchable` flag: whether the edge may be joined with a counterpart
//!   edge in another graph by the multi-graph resolver.
//!
//! Kinds are an open set. The crate ships the OS kind set in two historical
//! encodings ([`os::OsContextStateFactory`] and
//! [`legacy::LegacyOsContextStateFactory`]); embedders plug their own sets in
//! through [`EdgeContextStateFactory`], the only seam graph construction and
//! reopen consume. Wire codes never leak past a factory: algorithm code sees
//! kinds, classes, and flags only.
//!
//! Decoding is fail-safe by contract: a code the factory never produced maps
//! to kind [`ContextKind::Unknown`] with class [`TraversalClass::Unknown`],
//! never to an error.

pub mod legacy;
pub mod os;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse classification consumed by the critical-path traversal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraversalClass {
    /// The worker was making progress; the edge is transparent to the
    /// backward walk and the bottleneck must be sought further back.
    Pass,
    /// The worker could not make progress; the edge is part of the critical
    /// path.
    Stop,
    /// No information; retained conservatively, since absence of information
    /// must never be read as progress.
    Unknown,
}

impl TraversalClass {
    /// Wire code of this class (stable across artifact versions).
    #[must_use]
    pub const fn serialize(self) -> u32 {
        match self {
            TraversalClass::Pass => 0,
            TraversalClass::Stop => 1,
            TraversalClass::Unknown => 2,
        }
    }

    /// Decode a wire code; anything unrecognized is `Unknown`.
    #[must_use]
    pub const fn deserialize(code: u32) -> Self {
        match code {
            0 => TraversalClass::Pass,
            1 => TraversalClass::Stop,
            _ => TraversalClass::Unknown,
        }
    }

    /// True for edges the walk crosses transparently.
    #[must_use]
    pub const fn is_pass(self) -> bool {
        matches!(self, TraversalClass::Pass)
    }

    /// True for edges retained on the critical path (`Stop` or `Unknown`).
    #[must_use]
    pub const fn is_retained(self) -> bool {
        !self.is_pass()
    }
}

impl fmt::Display for TraversalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalClass::Pass => write!(f, "pass"),
            TraversalClass::Stop => write!(f, "stop"),
            TraversalClass::Unknown => write!(f, "unknown"),
        }
    }
}

/// Execution-context kind of an edge.
///
/// The named variants cover the OS kind set; embedder-defined kinds use
/// [`Custom`](Self::Custom) together with a factory that assigns them wire
/// codes and classes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKind {
    /// Adjacent vertices with no recorded edge between them.
    NoEdge,
    /// Synthetic "epsilon" edge marking the start of a worker's lifeline;
    /// terminates backward traversal.
    Eps,
    /// Context could not be determined (also the fail-safe decode target).
    Unknown,
    /// Recorded but unclassified context.
    Default,
    /// Actively executing on a CPU.
    Running,
    /// Blocked, waiting to be woken.
    Blocked,
    /// Servicing an interrupt.
    Interrupted,
    /// Runnable but preempted by another worker.
    Preempted,
    /// Waiting on a timer expiry.
    Timer,
    /// Waiting on network I/O; the one OS kind matchable across graphs.
    Network,
    /// Waiting on user input.
    UserInput,
    /// Waiting on a block device.
    BlockDevice,
    /// Inter-processor interrupt.
    Ipi,
    /// Embedder-defined kind, identified by a descriptive name.
    Custom(String),
}

impl ContextKind {
    /// True for the synthetic lifeline-start edge.
    #[must_use]
    pub fn is_eps(&self) -> bool {
        matches!(self, ContextKind::Eps)
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextKind::NoEdge => write!(f, "no-edge"),
            ContextKind::Eps => write!(f, "eps"),
            ContextKind::Unknown => write!(f, "unknown"),
            ContextKind::Default => write!(f, "default"),
            ContextKind::Running => write!(f, "running"),
            ContextKind::Blocked => write!(f, "blocked"),
            ContextKind::Interrupted => write!(f, "interrupted"),
            ContextKind::Preempted => write!(f, "preempted"),
            ContextKind::Timer => write!(f, "timer"),
            ContextKind::Network => write!(f, "network"),
            ContextKind::UserInput => write!(f, "user-input"),
            ContextKind::BlockDevice => write!(f, "block-device"),
            ContextKind::Ipi => write!(f, "ipi"),
            ContextKind::Custom(name) => write!(f, "{name}"),
        }
    }
}

/// Fully resolved context of one edge: kind plus the derived facts the
/// algorithms consume, plus opaque presentation metadata.
///
/// States are produced by an [`EdgeContextStateFactory`] (or by the typed
/// constructors on the shipped factories) and carried through the store
/// unchanged; the traversal class and matchable flag are data here precisely
/// so that no algorithm ever dispatches on the kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeContextState {
    kind: ContextKind,
    class: TraversalClass,
    matchable: bool,
    code: u32,
    #[serde(default)]
    styles: serde_json::Value,
}

impl EdgeContextState {
    /// Assemble a state. Usually called by a factory, not by embedder code.
    #[must_use]
    pub fn new(kind: ContextKind, class: TraversalClass, matchable: bool, code: u32) -> Self {
        Self {
            kind,
            class,
            matchable,
            code,
            styles: serde_json::Value::Null,
        }
    }

    /// Attach opaque presentation metadata. The core carries it through
    /// unchanged and never interprets it.
    #[must_use]
    pub fn with_styles(mut self, styles: serde_json::Value) -> Self {
        self.styles = styles;
        self
    }

    /// Synthesized filler for intervals the traversal has no information for.
    ///
    /// Fillers keep critical paths gap-free; they are never persisted, so the
    /// wire code is the fail-safe unknown code shared by all shipped
    /// numberings.
    #[must_use]
    pub fn synthetic_unknown() -> Self {
        Self::new(ContextKind::Unknown, TraversalClass::Unknown, false, 2)
    }

    /// The execution-context kind.
    #[must_use]
    pub fn kind(&self) -> &ContextKind {
        &self.kind
    }

    /// The derived traversal class.
    #[must_use]
    pub fn class(&self) -> TraversalClass {
        self.class
    }

    /// Whether this edge may be joined across graphs by the resolver.
    #[must_use]
    pub fn matchable(&self) -> bool {
        self.matchable
    }

    /// Wire code under the factory that produced this state.
    #[must_use]
    pub fn serialize(&self) -> u32 {
        self.code
    }

    /// Opaque presentation metadata, passed through for the embedding UI.
    #[must_use]
    pub fn styles(&self) -> &serde_json::Value {
        &self.styles
    }
}

impl fmt::Display for EdgeContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.class)
    }
}

/// Factory seam through which an embedder plugs a domain-specific kind set
/// into graph construction and reopen.
///
/// Implementations must be pure and total: every `u32` yields a state, with
/// unrecognized codes mapping to kind `Unknown` / class `Unknown`, and
/// `create_context_state(s.serialize()) == s` for every state `s` the factory
/// ever produced. The store is agnostic to which factory is used as long as
/// codes are self-consistent within one artifact.
pub trait EdgeContextStateFactory: Send + Sync {
    /// Decode a wire code into a full context state. Never fails.
    fn create_context_state(&self, code: u32) -> EdgeContextState;
}
