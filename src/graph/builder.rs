//! Building-state graph construction over the sidecar append log.

use std::fs::{self, File};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use tracing::instrument;

use crate::context::{EdgeContextState, EdgeContextStateFactory};
use crate::errors::StoreError;
use crate::graph::{SealedGraph, Vertex};
use crate::store::format::{
    FLAG_HAS_OUTGOING, Footer, HEADER_LEN, Header, LinkRecord, RECORD_LEN, Section, VertexRecord,
};
use crate::store::log::{LogEntry, LogReader, LogWriter};
use crate::workers::{GraphWorker, WorkerId, WorkerRegistry, WorkerSerializer};

/// A vertex whose on-disk record is not final yet: its outgoing edge may
/// still arrive.
#[derive(Clone, Copy, Debug)]
struct PendingVertex {
    timestamp: i64,
    outgoing: Option<u32>,
}

/// Per-worker build state. Only the last two vertices are buffered; everything
/// older is already in the log.
#[derive(Clone, Copy, Debug, Default)]
struct Timeline {
    prev: Option<PendingVertex>,
    tail: Option<PendingVertex>,
}

/// Building-state execution graph: single writer, append-only, backed by a
/// sidecar log until [`seal`](Self::seal) produces the immutable artifact.
///
/// Appends assume the construction driver feeds each worker's events in
/// timestamp order; violations are rejected rather than re-sorted, since
/// re-sorting would defeat the append-only layout. The outgoing edge of a
/// vertex must be appended before a second later vertex of the same worker
/// arrives (the builder buffers only the chain tail).
///
/// Any I/O error is fatal to the instance: discard it and retry the whole
/// construction.
pub struct GraphBuilder<W, S> {
    path: PathBuf,
    version: u32,
    start_time: i64,
    serializer: S,
    factory: Arc<dyn EdgeContextStateFactory>,
    registry: WorkerRegistry<W>,
    timelines: FxHashMap<WorkerId, Timeline>,
    log: LogWriter,
    link_count: u64,
    created_at: DateTime<Utc>,
}

impl<W, S> GraphBuilder<W, S>
where
    W: GraphWorker,
    S: WorkerSerializer<W>,
{
    /// Create a new building-state graph at `path`.
    ///
    /// The artifact itself is only written at seal time; until then appends
    /// accumulate in `<path>.log`. Fails with an I/O error if the location is
    /// not writable.
    #[instrument(skip(serializer, factory), err)]
    pub fn create(
        path: &Path,
        version: u32,
        start_time: i64,
        serializer: S,
        factory: Arc<dyn EdgeContextStateFactory>,
    ) -> Result<Self, StoreError> {
        let log = LogWriter::create(&log_path(path))?;
        tracing::debug!(path = %path.display(), version, start_time, "created building graph");
        Ok(GraphBuilder {
            path: path.to_path_buf(),
            version,
            start_time,
            serializer,
            factory,
            registry: WorkerRegistry::new(),
            timelines: FxHashMap::default(),
            log,
            link_count: 0,
            created_at: Utc::now(),
        })
    }

    /// Format revision this graph is being written with.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Start of the time window this graph covers.
    #[must_use]
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// The worker registry as populated so far.
    #[must_use]
    pub fn registry(&self) -> &WorkerRegistry<W> {
        &self.registry
    }

    /// Append a vertex to `worker`'s chain, registering the worker on first
    /// sight.
    ///
    /// Timestamps must be strictly increasing per worker.
    pub fn append_vertex(&mut self, worker: &W, timestamp: i64) -> Result<Vertex, StoreError> {
        let id = self.registry.id_for(worker);
        let timeline = self.timelines.entry(id).or_default();
        if let Some(tail) = timeline.tail
            && timestamp <= tail.timestamp
        {
            return Err(StoreError::OutOfOrder {
                worker: id,
                prev: tail.timestamp,
                next: timestamp,
            });
        }
        if let Some(prev) = timeline.prev.take() {
            self.log.append_vertex(id.raw(), record_for(prev))?;
        }
        timeline.prev = timeline.tail.take();
        timeline.tail = Some(PendingVertex {
            timestamp,
            outgoing: None,
        });
        Ok(Vertex::new(id, timestamp))
    }

    /// Append the chain edge between the two most recently appended vertices
    /// of one worker.
    ///
    /// `from` and `to` must be exactly those vertices; a vertex owns at most
    /// one outgoing edge.
    pub fn append_edge(
        &mut self,
        from: Vertex,
        to: Vertex,
        state: &EdgeContextState,
    ) -> Result<(), StoreError> {
        if from.worker != to.worker {
            return Err(StoreError::InvalidEdge {
                detail: format!(
                    "chain edge spans workers {} and {}; use append_link",
                    from.worker, to.worker
                ),
            });
        }
        let timeline = self
            .timelines
            .get_mut(&from.worker)
            .ok_or(StoreError::UnknownWorker { worker: from.worker })?;
        let (Some(prev), Some(tail)) = (timeline.prev.as_mut(), timeline.tail) else {
            return Err(StoreError::InvalidEdge {
                detail: "edge endpoints are no longer the chain tail".into(),
            });
        };
        if prev.timestamp != from.timestamp || tail.timestamp != to.timestamp {
            return Err(StoreError::InvalidEdge {
                detail: format!(
                    "edge {}..{} does not connect the last two vertices ({}..{})",
                    from.timestamp, to.timestamp, prev.timestamp, tail.timestamp
                ),
            });
        }
        if prev.outgoing.is_some() {
            return Err(StoreError::InvalidEdge {
                detail: format!("vertex {from} already has an outgoing edge"),
            });
        }
        prev.outgoing = Some(state.serialize());
        Ok(())
    }

    /// Append a cross-worker link edge.
    ///
    /// Both endpoints must belong to already-registered workers; source and
    /// destination must be on different workers.
    pub fn append_link(
        &mut self,
        from: Vertex,
        to: Vertex,
        state: &EdgeContextState,
    ) -> Result<(), StoreError> {
        if from.worker == to.worker {
            return Err(StoreError::InvalidEdge {
                detail: format!("link edge within {}; use append_edge", from.worker),
            });
        }
        for endpoint in [from, to] {
            if !self.registry.contains(endpoint.worker) {
                return Err(StoreError::UnknownWorker {
                    worker: endpoint.worker,
                });
            }
        }
        self.log.append_link(LinkRecord {
            from_worker: from.worker.raw(),
            from_ts: from.timestamp,
            to_worker: to.worker.raw(),
            to_ts: to.timestamp,
            code: state.serialize(),
        })?;
        self.link_count += 1;
        Ok(())
    }

    /// Seal the graph: replay the log into the immutable artifact, flush it
    /// to disk, and return the sealed, query-only handle.
    ///
    /// The artifact is independently reopenable afterwards; the sidecar log
    /// is removed.
    #[instrument(skip(self), fields(path = %self.path.display()), err)]
    pub fn seal(mut self) -> Result<SealedGraph<W>, StoreError> {
        // Flush the buffered chain tails, in id order for a deterministic log.
        let mut ids: Vec<WorkerId> = self.timelines.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(timeline) = self.timelines.get_mut(&id) {
                for pending in [timeline.prev.take(), timeline.tail.take()]
                    .into_iter()
                    .flatten()
                {
                    self.log.append_vertex(id.raw(), record_for(pending))?;
                }
            }
        }
        self.log.flush()?;

        // Pass 1: size each worker's section.
        let worker_count = self.registry.len();
        let mut counts = vec![0u64; worker_count];
        let mut links = Vec::new();
        let mut reader = LogReader::open(self.log.path())?;
        while let Some(entry) = reader.next_entry()? {
            match entry {
                LogEntry::Vertex { worker, .. } => counts[worker as usize] += 1,
                LogEntry::Link(link) => links.push(link),
            }
        }

        let mut sections = Vec::with_capacity(worker_count);
        let mut offset = HEADER_LEN;
        for (raw, count) in counts.iter().enumerate() {
            sections.push(Section {
                worker: WorkerId::new(raw as u32),
                offset,
                count: *count,
            });
            offset += count * RECORD_LEN;
        }
        let footer_offset = offset;

        // Pass 2: scatter records into their sections.
        let mut file = File::create(&self.path)?;
        file.write_all(
            &Header {
                version: self.version,
                start_time: self.start_time,
                footer_offset,
            }
            .encode(),
        )?;
        let mut cursors: Vec<u64> = sections.iter().map(|s| s.offset).collect();
        let mut reader = LogReader::open(self.log.path())?;
        while let Some(entry) = reader.next_entry()? {
            if let LogEntry::Vertex { worker, record } = entry {
                let cursor = &mut cursors[worker as usize];
                file.seek(SeekFrom::Start(*cursor))?;
                file.write_all(&record.encode())?;
                *cursor += RECORD_LEN;
            }
        }

        let footer = Footer {
            worker_table: self.registry.encode_all(&self.serializer)?,
            sections: sections.clone(),
            links,
        };
        file.seek(SeekFrom::Start(footer_offset))?;
        let mut buffered = BufWriter::new(&mut file);
        footer.write_to(&mut buffered)?;
        buffered.flush()?;
        drop(buffered);
        file.sync_all()?;
        drop(file);
        fs::remove_file(self.log.path())?;

        let vertex_total: u64 = counts.iter().sum();
        tracing::info!(
            workers = worker_count,
            vertices = vertex_total,
            links = self.link_count,
            elapsed_ms = (Utc::now() - self.created_at).num_milliseconds(),
            "sealed graph"
        );

        SealedGraph::from_parts(
            self.path,
            self.version,
            self.start_time,
            self.registry,
            footer,
            self.factory,
        )
    }
}

/// Like [`GraphBuilder::create`], but an I/O failure is a distinguishable
/// non-throwing result so the embedder can choose between rebuild and abort
/// without unwinding.
pub fn create_graph_instance<W, S>(
    path: &Path,
    version: u32,
    start_time: i64,
    serializer: S,
    factory: Arc<dyn EdgeContextStateFactory>,
) -> Option<GraphBuilder<W, S>>
where
    W: GraphWorker,
    S: WorkerSerializer<W>,
{
    match GraphBuilder::create(path, version, start_time, serializer, factory) {
        Ok(builder) => Some(builder),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "graph instance creation failed");
            None
        }
    }
}

fn record_for(pending: PendingVertex) -> VertexRecord {
    VertexRecord {
        timestamp: pending.timestamp,
        code: pending.outgoing.unwrap_or(0),
        flags: if pending.outgoing.is_some() {
            FLAG_HAS_OUTGOING
        } else {
            0
        },
    }
}

fn log_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".log");
    PathBuf::from(os)
}

impl<W, S> std::fmt::Debug for GraphBuilder<W, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("path", &self.path)
            .field("version", &self.version)
            .field("start_time", &self.start_time)
            .field("workers", &self.timelines.len())
            .finish_non_exhaustive()
    }
}
