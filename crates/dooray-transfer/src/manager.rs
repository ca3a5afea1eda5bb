//! Download session orchestration.
//!
//! The manager owns the full session lifecycle: metadata fetch, streamed
//! retrieval, spill to storage, chunk-count computation, registration, and
//! the serving of individual chunks until cleanup or idle eviction.

use std::{path::PathBuf, sync::Arc, time::Duration};

use bytes::BytesMut;
use futures::StreamExt;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    error::TransferError,
    policy,
    reader::{self, ChunkPayload},
    session::{DownloadSession, SessionContent},
    source::{FileLocator, FileSource},
    store::SessionStore,
};

/// Tunables for the transfer subsystem.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Directory for spill files of large downloads.
    pub spool_dir: PathBuf,
    /// Files at or below this declared size are buffered in memory instead of
    /// spilled.
    pub memory_threshold_bytes: u64,
    /// Hard ceiling on the encoded payload of a single chunk response. A
    /// safety net against an under-powered transport, independent of the
    /// slicing tiers.
    pub max_encoded_response_bytes: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            spool_dir: std::env::temp_dir(),
            memory_threshold_bytes: 1024 * 1024,
            max_encoded_response_bytes: 5_000_000,
        }
    }
}

/// Session descriptor returned by [`TransferManager::start_download`].
///
/// Carries the first chunk inline to save the caller one round trip; chunk 0
/// remains independently retrievable through the chunk reader.
#[derive(Debug, Serialize)]
pub struct DownloadStarted {
    pub session_id: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub total_chunks: u64,
    pub chunk_unit_size: u64,
    /// Hex SHA-256 of the full raw content, for verification after the caller
    /// reassembles all chunks.
    pub content_sha256: String,
    pub first_chunk: ChunkPayload,
}

/// Orchestrates chunked download sessions against an upstream file source.
pub struct TransferManager {
    source: Arc<dyn FileSource>,
    store: Arc<SessionStore>,
    config: TransferConfig,
}

impl TransferManager {
    pub fn new(source: Arc<dyn FileSource>, store: Arc<SessionStore>, config: TransferConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Fetch a file from upstream, slice it, and register a session.
    ///
    /// Any upstream or storage failure is fatal to this call: no partial
    /// session persists and a partially-written spill file is removed before
    /// the error propagates.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream fetch fails or the spill file cannot
    /// be written.
    #[instrument(skip(self), fields(locator = %locator))]
    pub async fn start_download(
        &self,
        locator: FileLocator,
    ) -> Result<DownloadStarted, TransferError> {
        let metadata = self.source.fetch_metadata(&locator).await?;
        let chunk_unit_size = policy::choose_chunk_size(metadata.size);
        debug!(
            file_name = %metadata.name,
            declared_size = metadata.size,
            chunk_unit_size,
            "starting download session"
        );

        let mut stream = self.source.open_stream(&locator).await?;
        let mut hasher = Sha256::new();

        let (content, size_bytes) = if metadata.size <= self.config.memory_threshold_bytes {
            let mut buf = BytesMut::with_capacity(usize::try_from(metadata.size).unwrap_or(0));
            while let Some(piece) = stream.next().await {
                let bytes = piece?;
                hasher.update(&bytes);
                buf.extend_from_slice(&bytes);
            }
            let size = buf.len() as u64;
            (SessionContent::Buffered(buf.freeze()), size)
        } else {
            tokio::fs::create_dir_all(&self.config.spool_dir).await?;
            let spill = tempfile::Builder::new()
                .prefix("dooray-dl-")
                .suffix(".part")
                .tempfile_in(&self.config.spool_dir)?;
            // Dropping `temp_path` on any failure below removes the partial
            // spill file.
            let (std_file, temp_path) = spill.into_parts();
            let mut file = tokio::fs::File::from_std(std_file);
            let mut written: u64 = 0;
            while let Some(piece) = stream.next().await {
                let bytes = piece?;
                hasher.update(&bytes);
                file.write_all(&bytes).await?;
                written += bytes.len() as u64;
            }
            file.flush().await?;
            (SessionContent::Spilled(temp_path), written)
        };

        let total_chunks = policy::chunk_count(size_bytes, chunk_unit_size);
        let session = DownloadSession {
            session_id: Uuid::new_v4().to_string(),
            locator,
            file_name: metadata.name,
            content,
            size_bytes,
            chunk_unit_size,
            total_chunks,
            content_sha256: hex::encode(hasher.finalize()),
        };

        let first_chunk =
            reader::read_chunk(&session, 0, self.config.max_encoded_response_bytes).await?;
        let descriptor = DownloadStarted {
            session_id: session.session_id.clone(),
            file_name: session.file_name.clone(),
            size_bytes,
            total_chunks,
            chunk_unit_size,
            content_sha256: session.content_sha256.clone(),
            first_chunk,
        };
        self.store.insert(session)?;

        info!(
            session_id = %descriptor.session_id,
            size_bytes,
            total_chunks,
            "download session ready"
        );
        Ok(descriptor)
    }

    /// Serve one chunk of a registered session.
    ///
    /// Reads are independent, repeatable, and may arrive in any order. A
    /// failure here leaves the session valid for subsequent reads or cleanup.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown, the index is out of range,
    /// or the spill file cannot be read.
    #[instrument(skip(self), fields(session_id = %session_id, chunk_index))]
    pub async fn read_chunk(
        &self,
        session_id: &str,
        chunk_index: i64,
    ) -> Result<ChunkPayload, TransferError> {
        let session = self.store.get(session_id)?;
        reader::read_chunk(&session, chunk_index, self.config.max_encoded_response_bytes).await
    }

    /// Release a session and its backing storage.
    ///
    /// Idempotent and infallible from the caller's point of view: cleaning up
    /// an unknown or already-removed session is a no-op, and a spill file
    /// that vanished externally is tolerated.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub fn cleanup(&self, session_id: &str) -> bool {
        match self.store.remove(session_id) {
            Ok(removed) => {
                if removed {
                    info!("download session cleaned up");
                }
                removed
            }
            Err(_) => false,
        }
    }

    /// Reap sessions idle longer than `max_idle`.
    pub fn evict_idle(&self, max_idle: Duration) -> Vec<String> {
        self.store.evict_idle(max_idle)
    }

    /// Access to the underlying session table.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }
}
