//! Transfer error taxonomy.
//!
//! Every failure carries a stable kind (the enum variant) plus a
//! human-readable message, so a calling agent can self-correct without
//! parsing prose. Start-time failures never leave a partial session behind;
//! read failures leave the session valid for subsequent reads and cleanup.

use thiserror::Error;

use crate::source::SourceError;

/// Failures of the chunked download subsystem.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Metadata or content fetch from the upstream service failed. Fatal to
    /// session creation.
    #[error("upstream error: {0}")]
    Upstream(#[from] SourceError),

    /// Spill write or chunk read failed on local storage.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// The session never existed or was already cleaned up. Sessions are
    /// time-bounded; callers are expected to handle this and restart.
    #[error("download session not found: {0}")]
    SessionNotFound(String),

    /// The requested chunk index is outside the session's valid range.
    #[error("chunk index {index} out of range; valid range is [0, {}]", .total.saturating_sub(1))]
    ChunkOutOfRange {
        /// The index the caller asked for.
        index: i64,
        /// Total chunk count of the session.
        total: u64,
    },

    /// Internal session table lock was poisoned by a panicking thread.
    #[error("session store lock poisoned")]
    LockPoisoned,
}

impl TransferError {
    /// Stable machine-readable tag for the router boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upstream(SourceError::Protocol(_)) => "protocol_error",
            Self::Upstream(SourceError::NotFound(_)) => "upstream_not_found",
            Self::Upstream(SourceError::Unauthorized(_)) => "upstream_unauthorized",
            Self::Upstream(SourceError::Network(_)) => "upstream_error",
            Self::Storage(_) => "storage_error",
            Self::SessionNotFound(_) => "session_not_found",
            Self::ChunkOutOfRange { .. } => "chunk_out_of_range",
            Self::LockPoisoned => "internal_error",
        }
    }
}
