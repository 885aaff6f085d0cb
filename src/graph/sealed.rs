//! Sealed-state graph: immutable, disk-backed, concurrently queryable.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::instrument;

use crate::context::EdgeContextStateFactory;
use crate::control::Cancellation;
use crate::errors::StoreError;
use crate::graph::{ChainEdge, LinkEdge, Vertex};
use crate::store::format::{
    Footer, HEADER_LEN, Header, LinkRecord, RECORD_LEN, Section, VertexRecord,
};
use crate::workers::{GraphWorker, WorkerId, WorkerRegistry, WorkerSerializer};

/// The chain edges incident to the vertex at (or at the floor of) a queried
/// timestamp.
#[derive(Clone, Debug, Default)]
pub struct EdgesAround {
    /// The anchor vertex: the last vertex at or before the queried timestamp.
    pub vertex: Option<Vertex>,
    /// Chain edge arriving at the anchor, if its predecessor recorded one.
    pub incoming: Option<ChainEdge>,
    /// Chain edge leaving the anchor, if one was recorded.
    pub outgoing: Option<ChainEdge>,
}

/// An immutable, sealed execution graph.
///
/// All queries are reads against the on-disk artifact; the handle is
/// `Send + Sync` and needs no external locking. Point queries binary-search a
/// worker's fixed-width record section, so they are logarithmic in that
/// worker's vertex count, never linear in the graph.
pub struct SealedGraph<W> {
    path: PathBuf,
    version: u32,
    start_time: i64,
    registry: WorkerRegistry<W>,
    sections: Vec<Section>,
    /// Links sorted by destination (worker, timestamp).
    links_by_to: Vec<LinkRecord>,
    /// Links sorted by source (worker, timestamp).
    links_by_from: Vec<LinkRecord>,
    factory: Arc<dyn EdgeContextStateFactory>,
    /// Pooled handle for point queries; iterators open their own.
    file: Mutex<File>,
}

impl<W: GraphWorker> SealedGraph<W> {
    /// Open an existing sealed artifact.
    ///
    /// Returns [`StoreError::NotFound`], the rebuild signal, if the file is
    /// absent or unreadable, is not a graph artifact, was never sealed, or
    /// records a different version or start time than expected. A mismatched
    /// artifact is never partially trusted.
    #[instrument(skip(serializer, factory))]
    pub fn open<S: WorkerSerializer<W>>(
        path: &Path,
        expected_version: u32,
        start_time: i64,
        serializer: &S,
        factory: Arc<dyn EdgeContextStateFactory>,
    ) -> Result<Self, StoreError> {
        match Self::try_open(path, expected_version, start_time, serializer, factory) {
            Ok(graph) => Ok(graph),
            Err(e) => {
                // Open failures are all recovery signals, not errors.
                let reason = e.to_string();
                tracing::debug!(path = %path.display(), %reason, "artifact rejected");
                Err(StoreError::not_found(reason))
            }
        }
    }

    fn try_open<S: WorkerSerializer<W>>(
        path: &Path,
        expected_version: u32,
        start_time: i64,
        serializer: &S,
        factory: Arc<dyn EdgeContextStateFactory>,
    ) -> Result<Self, StoreError> {
        let mut file = File::open(path)?;
        let mut buf = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut buf)?;
        let header = Header::decode(&buf)?;
        if header.version != expected_version {
            return Err(StoreError::not_found(format!(
                "version {} on disk, {} expected",
                header.version, expected_version
            )));
        }
        if header.start_time != start_time {
            return Err(StoreError::not_found(format!(
                "start time {} on disk, {} expected",
                header.start_time, start_time
            )));
        }
        // Never written by seal; guards against zero-filled or hand-made files.
        if header.footer_offset == 0 {
            return Err(StoreError::not_found("header carries no footer offset"));
        }
        file.seek(SeekFrom::Start(header.footer_offset))?;
        let footer = Footer::read_from(&mut BufReader::new(&mut file))?;
        let registry = WorkerRegistry::decode_all(serializer, &footer.worker_table)?;
        Self::assemble(path.to_path_buf(), header.version, header.start_time, registry, footer, factory, file)
    }

    /// Build the sealed handle straight out of a just-finished seal, without
    /// re-parsing the artifact.
    pub(crate) fn from_parts(
        path: PathBuf,
        version: u32,
        start_time: i64,
        registry: WorkerRegistry<W>,
        footer: Footer,
        factory: Arc<dyn EdgeContextStateFactory>,
    ) -> Result<Self, StoreError> {
        let file = File::open(&path)?;
        Self::assemble(path, version, start_time, registry, footer, factory, file)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        path: PathBuf,
        version: u32,
        start_time: i64,
        registry: WorkerRegistry<W>,
        footer: Footer,
        factory: Arc<dyn EdgeContextStateFactory>,
        file: File,
    ) -> Result<Self, StoreError> {
        let mut links_by_to = footer.links.clone();
        links_by_to.sort_unstable_by_key(|l| (l.to_worker, l.to_ts, l.from_worker, l.from_ts));
        let mut links_by_from = footer.links;
        links_by_from.sort_unstable_by_key(|l| (l.from_worker, l.from_ts, l.to_worker, l.to_ts));
        Ok(SealedGraph {
            path,
            version,
            start_time,
            registry,
            sections: footer.sections,
            links_by_to,
            links_by_from,
            factory,
            file: Mutex::new(file),
        })
    }

    /// Format revision recorded in the artifact header.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Start of the time window this graph covers.
    #[must_use]
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Path of the backing artifact.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All worker ids in this graph, in assignment order.
    #[must_use]
    pub fn all_workers(&self) -> Vec<WorkerId> {
        self.registry.ids().collect()
    }

    /// The persisted worker registry.
    #[must_use]
    pub fn registry(&self) -> &WorkerRegistry<W> {
        &self.registry
    }

    /// Worker identity for an id assigned by this graph.
    #[must_use]
    pub fn worker_for(&self, id: WorkerId) -> Option<&W> {
        self.registry.worker_for(id)
    }

    /// Id for a worker identity, if this graph ever saw it.
    #[must_use]
    pub fn id_of(&self, worker: &W) -> Option<WorkerId> {
        self.registry.lookup(worker)
    }

    /// Lazy, restartable iteration over one worker's vertices in timestamp
    /// order. Each call opens a fresh read handle, so iterators from
    /// different threads never contend.
    pub fn vertices_of(&self, worker: WorkerId) -> Result<VertexIter, StoreError> {
        let section = self.section(worker)?;
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start(section.offset))?;
        Ok(VertexIter {
            worker,
            reader,
            remaining: section.count,
            cancellation: None,
            cancelled: false,
        })
    }

    /// The vertex at exactly (worker, timestamp), if it exists.
    pub fn vertex_at(&self, worker: WorkerId, timestamp: i64) -> Result<Option<Vertex>, StoreError> {
        let section = self.section(worker)?;
        let Some(index) = self.floor_index(section, timestamp)? else {
            return Ok(None);
        };
        let record = self.record_at(section, index)?;
        Ok((record.timestamp == timestamp).then(|| Vertex::new(worker, timestamp)))
    }

    /// First vertex of a worker's chain, if the chain is non-empty.
    pub fn head_vertex(&self, worker: WorkerId) -> Result<Option<Vertex>, StoreError> {
        let section = self.section(worker)?;
        if section.count == 0 {
            return Ok(None);
        }
        let record = self.record_at(section, 0)?;
        Ok(Some(Vertex::new(worker, record.timestamp)))
    }

    /// Last vertex of a worker's chain, if the chain is non-empty.
    pub fn tail_vertex(&self, worker: WorkerId) -> Result<Option<Vertex>, StoreError> {
        let section = self.section(worker)?;
        if section.count == 0 {
            return Ok(None);
        }
        let record = self.record_at(section, section.count - 1)?;
        Ok(Some(Vertex::new(worker, record.timestamp)))
    }

    /// The chain edges around the vertex at (or at the floor of) `timestamp`
    /// on `worker`'s chain.
    ///
    /// Logarithmic in the worker's vertex count.
    pub fn edges_around(&self, worker: WorkerId, timestamp: i64) -> Result<EdgesAround, StoreError> {
        let section = self.section(worker)?;
        let Some(index) = self.floor_index(section, timestamp)? else {
            return Ok(EdgesAround::default());
        };
        let anchor = self.record_at(section, index)?;
        let incoming = if index > 0 {
            let prev = self.record_at(section, index - 1)?;
            prev.has_outgoing().then(|| ChainEdge {
                worker,
                from_ts: prev.timestamp,
                to_ts: anchor.timestamp,
                state: self.factory.create_context_state(prev.code),
            })
        } else {
            None
        };
        let outgoing = if anchor.has_outgoing() && index + 1 < section.count {
            let next = self.record_at(section, index + 1)?;
            Some(ChainEdge {
                worker,
                from_ts: anchor.timestamp,
                to_ts: next.timestamp,
                state: self.factory.create_context_state(anchor.code),
            })
        } else {
            None
        };
        Ok(EdgesAround {
            vertex: Some(Vertex::new(worker, anchor.timestamp)),
            incoming,
            outgoing,
        })
    }

    /// Link edges arriving at exactly this vertex, ordered by source.
    #[must_use]
    pub fn links_into(&self, vertex: Vertex) -> Vec<LinkEdge> {
        let key = (vertex.worker.raw(), vertex.timestamp);
        let lo = self
            .links_by_to
            .partition_point(|l| (l.to_worker, l.to_ts) < key);
        let hi = self
            .links_by_to
            .partition_point(|l| (l.to_worker, l.to_ts) <= key);
        self.links_by_to[lo..hi]
            .iter()
            .map(|l| self.link_edge(l))
            .collect()
    }

    /// Link edges leaving exactly this vertex, ordered by destination.
    #[must_use]
    pub fn links_from(&self, vertex: Vertex) -> Vec<LinkEdge> {
        let key = (vertex.worker.raw(), vertex.timestamp);
        let lo = self
            .links_by_from
            .partition_point(|l| (l.from_worker, l.from_ts) < key);
        let hi = self
            .links_by_from
            .partition_point(|l| (l.from_worker, l.from_ts) <= key);
        self.links_by_from[lo..hi]
            .iter()
            .map(|l| self.link_edge(l))
            .collect()
    }

    fn link_edge(&self, record: &LinkRecord) -> LinkEdge {
        LinkEdge {
            from: Vertex::new(WorkerId::new(record.from_worker), record.from_ts),
            to: Vertex::new(WorkerId::new(record.to_worker), record.to_ts),
            state: self.factory.create_context_state(record.code),
        }
    }

    fn section(&self, worker: WorkerId) -> Result<Section, StoreError> {
        self.sections
            .get(worker.raw() as usize)
            .copied()
            .ok_or(StoreError::UnknownWorker { worker })
    }

    /// Index of the last record with `timestamp <= ts`, or `None` if the
    /// section is empty or starts after `ts`.
    fn floor_index(&self, section: Section, ts: i64) -> Result<Option<u64>, StoreError> {
        let mut lo = 0u64;
        let mut hi = section.count;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.record_at(section, mid)?.timestamp <= ts {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo.checked_sub(1))
    }

    fn record_at(&self, section: Section, index: u64) -> Result<VertexRecord, StoreError> {
        debug_assert!(index < section.count);
        let mut buf = [0u8; RECORD_LEN as usize];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(section.offset + index * RECORD_LEN))?;
            file.read_exact(&mut buf)?;
        }
        Ok(VertexRecord::decode(&buf))
    }
}

impl<W> std::fmt::Debug for SealedGraph<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedGraph")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("start_time", &self.start_time)
            .field("workers", &self.sections.len())
            .field("links", &self.links_by_to.len())
            .finish_non_exhaustive()
    }
}

/// Lazy iterator over one worker's vertices, in timestamp order.
///
/// Yields `Result` items because every step is a disk read. Honors an
/// optional [`Cancellation`] token at vertex granularity: a cancelled
/// iterator simply stops early, with [`cancelled`](Self::cancelled) telling
/// partial from complete.
pub struct VertexIter {
    worker: WorkerId,
    reader: BufReader<File>,
    remaining: u64,
    cancellation: Option<Cancellation>,
    cancelled: bool,
}

impl VertexIter {
    /// Attach a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: Cancellation) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// True if the iterator stopped early because of cancellation.
    #[must_use]
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    /// Vertices not yet yielded.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for VertexIter {
    type Item = Result<Vertex, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 || self.cancelled {
            return None;
        }
        if let Some(token) = &self.cancellation
            && token.is_cancelled()
        {
            self.cancelled = true;
            return None;
        }
        self.remaining -= 1;
        let mut buf = [0u8; RECORD_LEN as usize];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => {
                let record = VertexRecord::decode(&buf);
                Some(Ok(Vertex::new(self.worker, record.timestamp)))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(StoreError::Io(e)))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        if self.cancellation.is_some() {
            (0, Some(n))
        } else {
            (n, Some(n))
        }
    }
}
