//! Download session model.

use bytes::Bytes;
use tempfile::TempPath;

use crate::source::FileLocator;

/// Where a session's raw content lives.
///
/// A session uses exactly one representation for its lifetime. Small files
/// stay in memory; larger files are spilled to a temporary file in the
/// configured spool directory. Dropping a spilled variant deletes the file
/// (best effort, tolerating the file already being gone).
#[derive(Debug)]
pub enum SessionContent {
    /// Raw bytes held in memory.
    Buffered(Bytes),
    /// Path to the spill file on scratch storage.
    Spilled(TempPath),
}

/// One in-flight or completed chunked retrieval.
///
/// Read-only after creation; deletion is the only mutation. Every field is
/// fixed when the session manager registers the session, so concurrent chunk
/// reads need no session-level locking.
#[derive(Debug)]
pub struct DownloadSession {
    /// Opaque unique token, the sole lookup key.
    pub session_id: String,
    /// Immutable upstream identity that produced this session.
    pub locator: FileLocator,
    /// Human-readable file name from upstream metadata.
    pub file_name: String,
    /// Raw content, buffered or spilled.
    pub content: SessionContent,
    /// Observed byte count of the raw content, computed from what was
    /// actually streamed rather than from declared metadata.
    pub size_bytes: u64,
    /// Raw-byte granularity used to slice the content.
    pub chunk_unit_size: u64,
    /// `ceil(size_bytes / chunk_unit_size)`, floored at 1.
    pub total_chunks: u64,
    /// Hex SHA-256 of the full raw content, verifiable after reassembly.
    pub content_sha256: String,
}
