//! Zstandard decompression.
//!
//! Unlike zlib/LZ4, Zstd is never named by an index record's
//! `compression` field - it is applied at the output sink when the final
//! content sniff reports `zst` (see `crate::output`).

use crate::error::Codec;
use crate::{Error, Result};

/// Decompress a complete Zstandard-compressed buffer.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    zstd::decode_all(data).map_err(|_| Error::DecompressError(Codec::Zstd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let original = b"npk entry payload bytes".repeat(8);
        let compressed = zstd::encode_all(&original[..], 3).unwrap();
        assert_eq!(decompress(&compressed).unwrap(), original);
    }

    #[test]
    fn garbage_input_errors() {
        assert!(decompress(&[0u8; 8]).is_err());
    }
}
