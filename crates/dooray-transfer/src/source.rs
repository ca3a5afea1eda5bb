//! Upstream file source boundary.
//!
//! The transfer core never talks HTTP itself; it consumes this trait. The
//! production implementation wraps the Dooray drive API client (which handles
//! the one-hop redirect retrieval protocol), and tests substitute in-memory
//! fakes.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

/// Identity of a file on the upstream service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileLocator {
    pub drive_id: String,
    pub file_id: String,
}

impl std::fmt::Display for FileLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.drive_id, self.file_id)
    }
}

/// File metadata as reported by the upstream service.
///
/// `size` is the declared size used for slicing plans; the observed byte
/// count from the content stream is authoritative.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
}

/// Streamed content body from the upstream service.
pub type SourceStream = Pin<Box<dyn Stream<Item = Result<Bytes, SourceError>> + Send>>;

/// Failures at the upstream boundary.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The resource does not exist upstream.
    #[error("resource not found: {0}")]
    NotFound(String),
    /// The upstream service rejected the credential.
    #[error("upstream rejected credentials: {0}")]
    Unauthorized(String),
    /// The upstream retrieval protocol was violated, e.g. a redirect response
    /// without a Location header.
    #[error("upstream protocol error: {0}")]
    Protocol(String),
    /// Transport-level failure (DNS, connect, mid-stream disconnect, 5xx).
    #[error("upstream request failed: {0}")]
    Network(String),
}

/// Read access to upstream file content.
///
/// `open_stream` must yield the body incrementally; callers never buffer a
/// large file whole in memory.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Resolve name and declared size for a file.
    async fn fetch_metadata(&self, locator: &FileLocator) -> Result<FileMetadata, SourceError>;

    /// Open the raw content stream for a file.
    async fn open_stream(&self, locator: &FileLocator) -> Result<SourceStream, SourceError>;
}
