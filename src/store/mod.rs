//! On-disk layout of graph artifacts.
//!
//! A sealed artifact is a single file:
//!
//! ```text
//! header  : magic, format version, start time, footer offset   (24 bytes)
//! records : per worker, a contiguous array of 16-byte vertex
//!           records (timestamp, outgoing context code, flags)
//! footer  : worker table, per-worker section table, link table
//! ```
//!
//! Fixed-width records are what make point queries logarithmic: the reader
//! binary-searches a worker's section by computing record offsets directly,
//! with no in-memory index over the vertices themselves. Only the footer
//! (registry, section table, cross-worker links) is held in memory.
//!
//! While a graph is building, appends go to a sidecar log (`<path>.log`);
//! sealing replays the log into the final layout and deletes it. A crash
//! before seal therefore leaves no artifact behind, and `open` correctly
//! reports not-found.

pub(crate) mod format;
pub(crate) mod log;
