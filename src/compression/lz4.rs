//! LZ4 block decompression.
//!
//! Entries compressed with LZ4 carry no embedded size prefix - the raw
//! LZ4 block is the entire payload, and the decompressed size is the
//! index record's `original_length` field, out-of-band (mirrors the
//! original tool's `lz4.block.decompress(data, uncompressed_size=original_length)`).

use crate::error::Codec;
use crate::{Error, Result};

/// Decompress an LZ4 block payload. `original_length` is the decompressed
/// size from the entry's index record - it is not stored in `data` itself.
pub fn decompress(data: &[u8], original_length: usize) -> Result<Vec<u8>> {
    lz4_flex::block::decompress(data, original_length)
        .map_err(|_| Error::DecompressError(Codec::Lz4))
}
