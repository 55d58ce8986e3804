//! Low-level I/O primitives shared by the container parser and pipeline.
//!
//! Each function reads exactly the bytes it promises or returns an error -
//! there is no partial-read ambiguity. All multi-byte integers in NPK/EXPK
//! containers are little-endian; there is no alignment requirement.

use std::io::Read;

use crate::{Error, Result};

#[inline]
fn read_exact<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::TruncatedContainer
        } else {
            Error::Io(e)
        }
    })
}

/// Read a little-endian `u16`.
#[inline]
pub(crate) fn le_u16<R: Read>(r: &mut R) -> Result<u16> {
    let mut b = [0u8; 2];
    read_exact(r, &mut b)?;
    Ok(u16::from_le_bytes(b))
}

/// Read a little-endian `u32`.
#[inline]
pub(crate) fn le_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    read_exact(r, &mut b)?;
    Ok(u32::from_le_bytes(b))
}

/// Read exactly `N` bytes into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    read_exact(r, &mut b)?;
    Ok(b)
}

/// Read exactly `len` bytes into a `Vec`.
#[inline]
pub(crate) fn bytesv<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut b = vec![0u8; len];
    read_exact(r, &mut b)?;
    Ok(b)
}

/// Read the 4-byte container signature and report whether it matched.
///
/// Unlike a simple equality check, the caller needs the raw bytes back to
/// build an [`Error::InvalidSignature`] when neither magic matches.
#[inline]
pub(crate) fn signature<R: Read>(r: &mut R) -> Result<[u8; 4]> {
    bytesa::<4>(r)
}
