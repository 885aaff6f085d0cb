//! Sidecar append log used while a graph is building.
//!
//! The log is a flat sequence of tagged entries in arrival order. Vertices of
//! different workers interleave freely; per-worker timestamp order is the
//! builder's invariant, not the log's. Sealing replays the log twice: once to
//! count records per worker (sizing the sections), once to scatter records
//! into their sections.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use super::format::{LinkRecord, VertexRecord, read_i64, read_u32};

const TAG_VERTEX: u8 = 0;
const TAG_LINK: u8 = 1;

/// One replayed log entry.
#[derive(Clone, Copy, Debug)]
pub(crate) enum LogEntry {
    Vertex {
        worker: u32,
        record: VertexRecord,
    },
    Link(LinkRecord),
}

/// Buffered writer over the sidecar log.
pub(crate) struct LogWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl LogWriter {
    pub(crate) fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(LogWriter {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn append_vertex(&mut self, worker: u32, record: VertexRecord) -> io::Result<()> {
        self.writer.write_all(&[TAG_VERTEX])?;
        self.writer.write_all(&worker.to_le_bytes())?;
        self.writer.write_all(&record.encode())?;
        Ok(())
    }

    pub(crate) fn append_link(&mut self, record: LinkRecord) -> io::Result<()> {
        self.writer.write_all(&[TAG_LINK])?;
        self.writer.write_all(&record.encode())?;
        Ok(())
    }

    /// Flush buffered entries so the log can be replayed.
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Sequential reader over the sidecar log.
pub(crate) struct LogReader {
    reader: BufReader<File>,
}

impl LogReader {
    pub(crate) fn open(path: &Path) -> io::Result<Self> {
        Ok(LogReader {
            reader: BufReader::new(File::open(path)?),
        })
    }

    /// Next entry, or `None` at a clean end of log.
    pub(crate) fn next_entry(&mut self) -> io::Result<Option<LogEntry>> {
        let mut tag = [0u8; 1];
        match self.reader.read_exact(&mut tag) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }
        match tag[0] {
            TAG_VERTEX => {
                let worker = read_u32(&mut self.reader)?;
                let timestamp = read_i64(&mut self.reader)?;
                let code = read_u32(&mut self.reader)?;
                let flags = read_u32(&mut self.reader)?;
                Ok(Some(LogEntry::Vertex {
                    worker,
                    record: VertexRecord {
                        timestamp,
                        code,
                        flags,
                    },
                }))
            }
            TAG_LINK => {
                let mut buf = [0u8; LinkRecord::LEN];
                self.reader.read_exact(&mut buf)?;
                Ok(Some(LogEntry::Link(LinkRecord::decode(&buf))))
            }
            other => Err(io::Error::new(
                ErrorKind::InvalidData,
                format!("unknown log entry tag {other}"),
            )),
        }
    }
}
