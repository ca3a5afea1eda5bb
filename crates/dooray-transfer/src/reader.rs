//! Chunk extraction and encoding.
//!
//! Reads are independent and repeatable: the same `(session, index)` pair
//! yields byte-identical output every time, and no cursor state is mutated.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};

use crate::{
    error::TransferError,
    session::{DownloadSession, SessionContent},
};

/// One encoded chunk plus its position metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkPayload {
    pub session_id: String,
    pub chunk_index: u64,
    pub total_chunks: u64,
    pub file_name: String,
    /// Base64-encoded raw bytes. Decode and concatenate in index order to
    /// reconstruct the file.
    pub chunk_data: String,
    /// Raw byte count actually returned.
    pub chunk_size: u64,
    /// Raw byte count of the full chunk. Differs from `chunk_size` only when
    /// `truncated` is set.
    pub full_chunk_size: u64,
    /// Set when the encoded payload exceeded the transport ceiling and the
    /// returned bytes are a prefix of the chunk. Degradation path, not normal
    /// behavior.
    pub truncated: bool,
    pub is_last_chunk: bool,
}

/// Extract and encode one chunk of a session.
///
/// `max_encoded_bytes` is the hard transport ceiling on the encoded payload,
/// independent of the slicing tier chosen at session start. A chunk whose
/// encoding exceeds it is truncated to the largest raw prefix that fits and
/// marked as such, rather than failing the transport.
pub(crate) async fn read_chunk(
    session: &DownloadSession,
    chunk_index: i64,
    max_encoded_bytes: usize,
) -> Result<ChunkPayload, TransferError> {
    let index = match u64::try_from(chunk_index) {
        Ok(index) if index < session.total_chunks => index,
        _ => {
            return Err(TransferError::ChunkOutOfRange {
                index: chunk_index,
                total: session.total_chunks,
            });
        }
    };

    let offset = index * session.chunk_unit_size;
    let raw = read_raw(session, offset).await?;

    let full_chunk_size = raw.len() as u64;
    let encoded = BASE64.encode(&raw);
    let (chunk_data, chunk_size, truncated) = if encoded.len() > max_encoded_bytes {
        // Truncate on a 3-byte boundary so the prefix re-encodes without
        // padding ambiguity.
        let keep = ((max_encoded_bytes / 4) * 3).min(raw.len());
        (BASE64.encode(&raw[..keep]), keep as u64, true)
    } else {
        (encoded, full_chunk_size, false)
    };

    Ok(ChunkPayload {
        session_id: session.session_id.clone(),
        chunk_index: index,
        total_chunks: session.total_chunks,
        file_name: session.file_name.clone(),
        chunk_data,
        chunk_size,
        full_chunk_size,
        truncated,
        is_last_chunk: index + 1 == session.total_chunks,
    })
}

async fn read_raw(session: &DownloadSession, offset: u64) -> Result<Bytes, TransferError> {
    let unit = session.chunk_unit_size;
    match &session.content {
        SessionContent::Buffered(bytes) => {
            let len = bytes.len() as u64;
            let start = offset.min(len) as usize;
            let end = (offset.saturating_add(unit)).min(len) as usize;
            Ok(bytes.slice(start..end))
        }
        SessionContent::Spilled(path) => {
            let mut file = tokio::fs::File::open(path).await?;
            file.seek(SeekFrom::Start(offset)).await?;
            let mut buf = vec![0u8; unit as usize];
            let mut filled = 0;
            // The final chunk is short; read until the unit is full or EOF.
            loop {
                let n = file.read(&mut buf[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
                if filled == buf.len() {
                    break;
                }
            }
            buf.truncate(filled);
            Ok(Bytes::from(buf))
        }
    }
}
