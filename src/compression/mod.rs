//! Decompression dispatch for entry payloads.
//!
//! An index record's `compression` field names ZLIB or LZ4 (or NONE).
//! Dispatch happens once, after scramble/rotor/nxs3 unwrapping, per
//! `crate::pipeline`'s stage 7 - `rot`-typed entries skip this step
//! entirely since the rotor stage already inflated them.
//!
//! Zstandard is never named by the `compression` field; it is applied at
//! the output sink (`crate::output`) when the final sniff reports `zst`,
//! regardless of what the record's `compression` field says.
//!
//! | Module | Algorithm | Wire shape |
//! |--------|-----------|------------|
//! | [`zlib`] | RFC 1950 zlib | whole payload is one zlib stream |
//! | [`lz4`]  | LZ4 block | little-endian `u32` decompressed-size prefix, then the raw block |
//! | [`zstd`] | Zstandard | whole payload is one Zstd frame |

pub mod lz4;
pub mod zlib;
pub mod zstd;

/// Codec tags parsed from an index record's `compression` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zlib,
    Lz4,
}

impl Compression {
    /// Decode the raw `compression` field value from an index record.
    ///
    /// Unrecognized values are treated as `None` rather than rejected -
    /// §9 leaves values beyond 0/1/2 unspecified and the reference tool
    /// is permissive here.
    pub(crate) fn from_raw(value: u16) -> Self {
        match value {
            1 => Compression::Zlib,
            2 => Compression::Lz4,
            _ => Compression::None,
        }
    }
}
