//! Binary codecs for the artifact header, vertex records, and footer.
//!
//! Everything is little-endian and fixed-width where the layout depends on
//! it. The artifact file is only created at seal time, header first with the
//! final footer offset already known, so a well-formed artifact never carries
//! a zero footer offset; open still rejects one rather than seeking to it.

use std::io::{self, Read, Write};

use crate::errors::StoreError;
use crate::workers::WorkerId;

/// `TGRF` in little-endian byte order.
pub(crate) const MAGIC: u32 = u32::from_le_bytes(*b"TGRF");

/// Header length in bytes: magic, version, start time, footer offset.
pub(crate) const HEADER_LEN: u64 = 24;

/// Vertex record length in bytes: timestamp, context code, flags.
pub(crate) const RECORD_LEN: u64 = 16;

/// Record flag: the vertex has an outgoing chain edge to its successor.
pub(crate) const FLAG_HAS_OUTGOING: u32 = 1;

/// Artifact header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    pub version: u32,
    pub start_time: i64,
    pub footer_offset: u64,
}

impl Header {
    pub(crate) fn encode(&self) -> [u8; HEADER_LEN as usize] {
        let mut buf = [0u8; HEADER_LEN as usize];
        buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.start_time.to_le_bytes());
        buf[16..24].copy_from_slice(&self.footer_offset.to_le_bytes());
        buf
    }

    /// Decode and validate the magic. Version and start-time checks are the
    /// caller's job; they decide between "not ours" and "wrong revision".
    pub(crate) fn decode(buf: &[u8; HEADER_LEN as usize]) -> Result<Self, StoreError> {
        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap_or_default());
        if magic != MAGIC {
            return Err(StoreError::not_found("bad magic, not a graph artifact"));
        }
        Ok(Header {
            version: u32::from_le_bytes(buf[4..8].try_into().unwrap_or_default()),
            start_time: i64::from_le_bytes(buf[8..16].try_into().unwrap_or_default()),
            footer_offset: u64::from_le_bytes(buf[16..24].try_into().unwrap_or_default()),
        })
    }
}

/// One vertex on a worker's timeline, as stored.
///
/// The outgoing edge's destination is implicit: it is always the next record
/// in the same section (the timeline is a simple chain). `code` is only
/// meaningful when [`FLAG_HAS_OUTGOING`] is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct VertexRecord {
    pub timestamp: i64,
    pub code: u32,
    pub flags: u32,
}

impl VertexRecord {
    pub(crate) fn has_outgoing(&self) -> bool {
        self.flags & FLAG_HAS_OUTGOING != 0
    }

    pub(crate) fn encode(&self) -> [u8; RECORD_LEN as usize] {
        let mut buf = [0u8; RECORD_LEN as usize];
        buf[0..8].copy_from_slice(&self.timestamp.to_le_bytes());
        buf[8..12].copy_from_slice(&self.code.to_le_bytes());
        buf[12..16].copy_from_slice(&self.flags.to_le_bytes());
        buf
    }

    pub(crate) fn decode(buf: &[u8; RECORD_LEN as usize]) -> Self {
        VertexRecord {
            timestamp: i64::from_le_bytes(buf[0..8].try_into().unwrap_or_default()),
            code: u32::from_le_bytes(buf[8..12].try_into().unwrap_or_default()),
            flags: u32::from_le_bytes(buf[12..16].try_into().unwrap_or_default()),
        }
    }
}

/// Location of one worker's record array inside the artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Section {
    pub worker: WorkerId,
    /// Absolute byte offset of the first record.
    pub offset: u64,
    /// Number of records.
    pub count: u64,
}

/// One cross-worker link edge, as stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LinkRecord {
    pub from_worker: u32,
    pub from_ts: i64,
    pub to_worker: u32,
    pub to_ts: i64,
    pub code: u32,
}

impl LinkRecord {
    pub(crate) const LEN: usize = 28;

    pub(crate) fn encode(&self) -> [u8; Self::LEN] {
        let mut buf = [0u8; Self::LEN];
        buf[0..4].copy_from_slice(&self.from_worker.to_le_bytes());
        buf[4..12].copy_from_slice(&self.from_ts.to_le_bytes());
        buf[12..16].copy_from_slice(&self.to_worker.to_le_bytes());
        buf[16..24].copy_from_slice(&self.to_ts.to_le_bytes());
        buf[24..28].copy_from_slice(&self.code.to_le_bytes());
        buf
    }

    pub(crate) fn decode(buf: &[u8; Self::LEN]) -> Self {
        LinkRecord {
            from_worker: u32::from_le_bytes(buf[0..4].try_into().unwrap_or_default()),
            from_ts: i64::from_le_bytes(buf[4..12].try_into().unwrap_or_default()),
            to_worker: u32::from_le_bytes(buf[12..16].try_into().unwrap_or_default()),
            to_ts: i64::from_le_bytes(buf[16..24].try_into().unwrap_or_default()),
            code: u32::from_le_bytes(buf[24..28].try_into().unwrap_or_default()),
        }
    }
}

/// Everything the reader keeps in memory about a sealed artifact.
#[derive(Clone, Debug, Default)]
pub(crate) struct Footer {
    /// Serialized worker identities, indexed by raw worker id.
    pub worker_table: Vec<Vec<u8>>,
    /// Per-worker record sections, in worker-id order.
    pub sections: Vec<Section>,
    /// Cross-worker link edges.
    pub links: Vec<LinkRecord>,
}

impl Footer {
    pub(crate) fn write_to<Wr: Write>(&self, w: &mut Wr) -> io::Result<()> {
        write_u32(w, self.worker_table.len() as u32)?;
        for bytes in &self.worker_table {
            write_u32(w, bytes.len() as u32)?;
            w.write_all(bytes)?;
        }
        write_u32(w, self.sections.len() as u32)?;
        for section in &self.sections {
            write_u32(w, section.worker.raw())?;
            w.write_all(&section.offset.to_le_bytes())?;
            w.write_all(&section.count.to_le_bytes())?;
        }
        write_u32(w, self.links.len() as u32)?;
        for link in &self.links {
            w.write_all(&link.encode())?;
        }
        Ok(())
    }

    pub(crate) fn read_from<R: Read>(r: &mut R) -> Result<Self, StoreError> {
        let worker_count = read_u32(r)? as usize;
        let mut worker_table = Vec::with_capacity(worker_count.min(1 << 20));
        for _ in 0..worker_count {
            let len = read_u32(r)? as usize;
            let mut bytes = vec![0u8; len];
            r.read_exact(&mut bytes)?;
            worker_table.push(bytes);
        }
        let section_count = read_u32(r)? as usize;
        let mut sections = Vec::with_capacity(section_count.min(1 << 20));
        for _ in 0..section_count {
            let worker = WorkerId::new(read_u32(r)?);
            let offset = read_u64(r)?;
            let count = read_u64(r)?;
            sections.push(Section {
                worker,
                offset,
                count,
            });
        }
        if sections.len() != worker_table.len() {
            return Err(StoreError::corrupt(format!(
                "{} sections for {} workers",
                sections.len(),
                worker_table.len()
            )));
        }
        let link_count = read_u32(r)? as usize;
        let mut links = Vec::with_capacity(link_count.min(1 << 20));
        for _ in 0..link_count {
            let mut buf = [0u8; LinkRecord::LEN];
            r.read_exact(&mut buf)?;
            links.push(LinkRecord::decode(&buf));
        }
        Ok(Footer {
            worker_table,
            sections,
            links,
        })
    }
}

pub(crate) fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub(crate) fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_u64<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn read_i64<R: Read>(r: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = Header {
            version: 7,
            start_time: -3,
            footer_offset: 4096,
        };
        let decoded = Header::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn bad_magic_is_not_found() {
        let mut buf = Header {
            version: 1,
            start_time: 0,
            footer_offset: 0,
        }
        .encode();
        buf[0] = b'X';
        let err = Header::decode(&buf).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn footer_round_trips() {
        let footer = Footer {
            worker_table: vec![b"alpha".to_vec(), b"beta".to_vec()],
            sections: vec![
                Section {
                    worker: WorkerId::new(0),
                    offset: 24,
                    count: 3,
                },
                Section {
                    worker: WorkerId::new(1),
                    offset: 72,
                    count: 0,
                },
            ],
            links: vec![LinkRecord {
                from_worker: 0,
                from_ts: 5,
                to_worker: 1,
                to_ts: 8,
                code: 9,
            }],
        };
        let mut bytes = Vec::new();
        footer.write_to(&mut bytes).unwrap();
        let back = Footer::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(back.worker_table, footer.worker_table);
        assert_eq!(back.sections, footer.sections);
        assert_eq!(back.links, footer.links);
    }
}
