//! zlib (RFC 1950) decompression.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::Codec;
use crate::{Error, Result};

/// Inflate a complete zlib-compressed buffer.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|_| Error::DecompressError(Codec::Zlib))?;
    Ok(out)
}
