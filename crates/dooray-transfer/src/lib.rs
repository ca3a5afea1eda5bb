//! Chunked large-file download sessions for the Dooray gateway.
//!
//! The LLM runtime calling the gateway enforces a hard per-response payload
//! ceiling, so large drive files cannot be returned in one reply. This crate
//! fetches a file from an upstream source, persists it transiently (in memory
//! or spilled to scratch storage), slices it into bounded-size base64 chunks,
//! and serves the chunks across independent requests addressed by
//! `(session_id, chunk_index)`.
//!
//! # Components
//!
//! - [`policy`]: pure mapping from file size to raw chunk granularity
//! - [`SessionStore`]: in-process session table with an injected [`Clock`],
//!   idle eviction, and teardown
//! - [`TransferManager`]: session lifecycle — start, chunk reads, cleanup
//! - [`FileSource`]: the upstream boundary the core consumes
//!
//! # Lifecycle
//!
//! A session is created by [`TransferManager::start_download`], read any
//! number of times in any order (reads never mutate the session), and
//! destroyed by [`TransferManager::cleanup`] or by the idle sweep. Start-time
//! failures leave neither a session nor a spill artifact behind.

pub mod policy;

mod error;
mod manager;
mod reader;
mod session;
mod source;
mod store;

pub use error::TransferError;
pub use manager::{DownloadStarted, TransferConfig, TransferManager};
pub use reader::ChunkPayload;
pub use session::{DownloadSession, SessionContent};
pub use source::{FileLocator, FileMetadata, FileSource, SourceError, SourceStream};
pub use store::{Clock, SessionStore, SystemClock};
