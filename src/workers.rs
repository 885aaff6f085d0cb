//! Worker identities: dense ids, the per-graph registry, and pluggable
//! identity serialization.
//!
//! A *worker* is whatever unit of execution the embedder traces: a thread, a
//! process, a host/tid pair. The graph core never inspects worker identities;
//! it maps each distinct identity to a dense [`WorkerId`] on first sight and
//! works with ids from then on. The registry travels inside the sealed
//! artifact, encoded by a [`WorkerSerializer`], so a reopened graph resolves
//! the same identities to the same ids.

use std::fmt;
use std::hash::Hash;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dense per-graph worker id, assigned in first-sight order starting at 0.
///
/// Ids are meaningful only within the graph that assigned them; two graphs
/// may map the same identity to different ids.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct WorkerId(u32);

impl WorkerId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        WorkerId(raw)
    }

    /// The raw id, used as an index into per-worker tables.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Marker for types usable as worker identities.
///
/// Blanket-implemented; any clonable, hashable, thread-safe identity type
/// qualifies.
pub trait GraphWorker: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> GraphWorker for T {}

/// A worker identity could not be encoded to, or decoded from, the artifact's
/// worker table.
#[derive(Debug, Error, Diagnostic)]
#[error("worker identity codec failure: {message}")]
#[diagnostic(
    code(tracegraph::workers::codec),
    help("The serializer used to open a graph must match the one it was sealed with.")
)]
pub struct WorkerCodecError {
    message: String,
}

impl WorkerCodecError {
    /// Wrap an underlying codec failure.
    pub fn new(message: impl Into<String>) -> Self {
        WorkerCodecError {
            message: message.into(),
        }
    }
}

/// Encodes worker identities into the artifact's worker table and back.
///
/// The same serializer (or a wire-compatible one) must be supplied when
/// reopening a graph; the store treats the encoded bytes as opaque.
pub trait WorkerSerializer<W>: Send + Sync {
    /// Encode one identity.
    fn encode(&self, worker: &W) -> Result<Vec<u8>, WorkerCodecError>;

    /// Decode one identity.
    fn decode(&self, bytes: &[u8]) -> Result<W, WorkerCodecError>;
}

/// JSON identity serializer, the default for serde-friendly worker types.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonWorkerSerializer;

impl<W> WorkerSerializer<W> for JsonWorkerSerializer
where
    W: Serialize + DeserializeOwned + Send + Sync,
{
    fn encode(&self, worker: &W) -> Result<Vec<u8>, WorkerCodecError> {
        serde_json::to_vec(worker).map_err(|e| WorkerCodecError::new(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<W, WorkerCodecError> {
        serde_json::from_slice(bytes).map_err(|e| WorkerCodecError::new(e.to_string()))
    }
}

/// Bidirectional identity ↔ id map for one graph.
///
/// Assignment is dense and first-sight ordered, which is what lets the store
/// use raw ids as indexes into its section table.
#[derive(Clone, Debug)]
pub struct WorkerRegistry<W> {
    ids: FxHashMap<W, WorkerId>,
    workers: Vec<W>,
}

impl<W: GraphWorker> WorkerRegistry<W> {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        WorkerRegistry {
            ids: FxHashMap::default(),
            workers: Vec::new(),
        }
    }

    /// Id for `worker`, assigning the next dense id on first sight.
    pub fn id_for(&mut self, worker: &W) -> WorkerId {
        if let Some(id) = self.ids.get(worker) {
            return *id;
        }
        let id = WorkerId::new(self.workers.len() as u32);
        self.ids.insert(worker.clone(), id);
        self.workers.push(worker.clone());
        id
    }

    /// Id for `worker`, if it was ever registered. Never assigns.
    #[must_use]
    pub fn lookup(&self, worker: &W) -> Option<WorkerId> {
        self.ids.get(worker).copied()
    }

    /// Identity behind an id assigned by this registry.
    #[must_use]
    pub fn worker_for(&self, id: WorkerId) -> Option<&W> {
        self.workers.get(id.raw() as usize)
    }

    /// True if this registry assigned `id`.
    #[must_use]
    pub fn contains(&self, id: WorkerId) -> bool {
        (id.raw() as usize) < self.workers.len()
    }

    /// Number of registered workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// True if no worker was ever registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// All assigned ids, in assignment order.
    pub fn ids(&self) -> impl Iterator<Item = WorkerId> + '_ {
        (0..self.workers.len() as u32).map(WorkerId::new)
    }

    /// All registered identities, in assignment order.
    pub fn workers(&self) -> impl Iterator<Item = &W> {
        self.workers.iter()
    }

    /// Encode the registry as the artifact's worker table, id order.
    pub(crate) fn encode_all<S: WorkerSerializer<W>>(
        &self,
        serializer: &S,
    ) -> Result<Vec<Vec<u8>>, WorkerCodecError> {
        self.workers.iter().map(|w| serializer.encode(w)).collect()
    }

    /// Rebuild a registry from a decoded worker table, preserving ids.
    pub(crate) fn decode_all<S: WorkerSerializer<W>>(
        serializer: &S,
        table: &[Vec<u8>],
    ) -> Result<Self, WorkerCodecError> {
        let mut registry = WorkerRegistry::new();
        for bytes in table {
            let worker = serializer.decode(bytes)?;
            registry.id_for(&worker);
        }
        Ok(registry)
    }
}

impl<W: GraphWorker> Default for WorkerRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}
