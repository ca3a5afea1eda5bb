//! Chunk size policy.
//!
//! Maps a file's declared size to the raw byte granularity used to slice its
//! content. Smaller files get the largest granularity the transport tolerates;
//! larger files trade round-trip count for a lower risk of any single encoded
//! chunk blowing past the transport's response ceiling.
//!
//! The tier sizes apply to RAW bytes. A full chunk's base64 payload is
//! therefore ~4/3 of the tier size; the separate encoded-size ceiling enforced
//! by the chunk reader (see [`crate::TransferConfig::max_encoded_response_bytes`])
//! is the guard for transports that cannot carry that.

const MIB: u64 = 1024 * 1024;
const KIB: u64 = 1024;

/// Files up to this size are sliced at [`CHUNK_SIZE_SMALL`].
pub const SMALL_FILE_MAX: u64 = 5 * MIB;
/// Files up to this size (and above [`SMALL_FILE_MAX`]) are sliced at
/// [`CHUNK_SIZE_MEDIUM`].
pub const MEDIUM_FILE_MAX: u64 = 50 * MIB;

/// Raw chunk size for files up to 5 MiB.
pub const CHUNK_SIZE_SMALL: u64 = MIB;
/// Raw chunk size for files up to 50 MiB.
pub const CHUNK_SIZE_MEDIUM: u64 = 256 * KIB;
/// Raw chunk size for files above 50 MiB.
pub const CHUNK_SIZE_LARGE: u64 = 64 * KIB;

/// Select the raw chunk size for a file of the given size.
///
/// Pure and total; the result is positive and monotonically non-increasing as
/// the file size grows.
pub fn choose_chunk_size(file_size_bytes: u64) -> u64 {
    if file_size_bytes <= SMALL_FILE_MAX {
        CHUNK_SIZE_SMALL
    } else if file_size_bytes <= MEDIUM_FILE_MAX {
        CHUNK_SIZE_MEDIUM
    } else {
        CHUNK_SIZE_LARGE
    }
}

/// Number of chunks needed to cover `size_bytes` at `chunk_unit_size`.
///
/// A zero-byte file yields exactly one (empty) chunk, never zero.
pub fn chunk_count(size_bytes: u64, chunk_unit_size: u64) -> u64 {
    if size_bytes == 0 {
        1
    } else {
        size_bytes.div_ceil(chunk_unit_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_boundaries_are_exact() {
        assert_eq!(choose_chunk_size(0), CHUNK_SIZE_SMALL);
        assert_eq!(choose_chunk_size(SMALL_FILE_MAX), CHUNK_SIZE_SMALL);
        assert_eq!(choose_chunk_size(SMALL_FILE_MAX + 1), CHUNK_SIZE_MEDIUM);
        assert_eq!(choose_chunk_size(MEDIUM_FILE_MAX), CHUNK_SIZE_MEDIUM);
        assert_eq!(choose_chunk_size(MEDIUM_FILE_MAX + 1), CHUNK_SIZE_LARGE);
        assert_eq!(choose_chunk_size(u64::MAX), CHUNK_SIZE_LARGE);
    }

    #[test]
    fn chunk_size_is_positive_and_monotone_non_increasing() {
        let probes = [
            0,
            1,
            SMALL_FILE_MAX - 1,
            SMALL_FILE_MAX,
            SMALL_FILE_MAX + 1,
            MEDIUM_FILE_MAX,
            MEDIUM_FILE_MAX + 1,
            500 * MIB,
            u64::MAX,
        ];
        let mut previous = u64::MAX;
        for size in probes {
            let chunk = choose_chunk_size(size);
            assert!(chunk > 0, "chunk size must be positive for size {size}");
            assert!(
                chunk <= previous,
                "chunk size must not increase with file size (size {size})"
            );
            previous = chunk;
        }
    }

    #[test]
    fn chunk_count_rounds_up() {
        assert_eq!(chunk_count(1, MIB), 1);
        assert_eq!(chunk_count(MIB, MIB), 1);
        assert_eq!(chunk_count(MIB + 1, MIB), 2);
        assert_eq!(chunk_count(3 * MIB, MIB), 3);
    }

    #[test]
    fn zero_byte_file_yields_one_chunk() {
        assert_eq!(chunk_count(0, MIB), 1);
    }

    #[test]
    fn three_mib_file_slices_into_three_chunks() {
        let size = 3 * MIB;
        let unit = choose_chunk_size(size);
        assert_eq!(unit, MIB);
        assert_eq!(chunk_count(size, unit), 3);
    }
}
