//! Library-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout npkit.
pub type Result<T> = std::result::Result<T, Error>;

/// Decompression codec named in a [`Error::DecompressError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Zlib,
    Lz4,
    Zstd,
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Codec::Zlib => write!(f, "zlib"),
            Codec::Lz4 => write!(f, "lz4"),
            Codec::Zstd => write!(f, "zstd"),
        }
    }
}

/// All errors the library can produce.
///
/// Error messages are kept intentionally terse; callers that need richer
/// context should wrap `Error` in their own type.
#[derive(Debug)]
pub enum Error {
    /// The 4-byte signature was neither `NXPK` nor `EXPK`.
    InvalidSignature([u8; 4]),
    /// The stream ended before all expected bytes could be read.
    TruncatedContainer,
    /// A record or table would read outside the container's bounds.
    InvalidRange,
    /// The EXPK index/payload block cipher rejected or mangled its input.
    IndexDecryptFailure,
    /// A scramble codec's computed window fell outside the payload.
    ScrambleOutOfRange,
    /// The rotor cipher's fixed key schedule could not be built.
    RotorKeyFailure,
    /// Decompression failed for the entry's declared codec.
    DecompressError(Codec),
    /// The `de_nxs3` subprocess exited non-zero or produced no output.
    ExternalToolError(String),
    /// Writing an extracted entry to disk failed.
    OutputIOError(io::Error),
    /// Reading or expanding a `zip`-sniffed entry failed.
    Zip(String),
    /// Two entries in the same container resolved to the same output path.
    PathCollision(std::path::PathBuf),
    /// A structural constraint was violated (message describes which one).
    Parse(&'static str),
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidSignature(sig) => {
                write!(f, "invalid signature: {:?}", String::from_utf8_lossy(sig))
            }
            Error::TruncatedContainer => write!(f, "container truncated before expected EOF"),
            Error::InvalidRange => write!(f, "invalid offset or size"),
            Error::IndexDecryptFailure => write!(f, "EXPK index/payload decryption failed"),
            Error::ScrambleOutOfRange => write!(f, "scramble window falls outside payload"),
            Error::RotorKeyFailure => write!(f, "rotor key schedule failed"),
            Error::DecompressError(codec) => write!(f, "{codec} decompression failed"),
            Error::ExternalToolError(msg) => write!(f, "external tool failed: {msg}"),
            Error::OutputIOError(e) => write!(f, "writing output failed: {e}"),
            Error::Zip(msg) => write!(f, "zip archive error: {msg}"),
            Error::PathCollision(p) => write!(f, "output path collision: {}", p.display()),
            Error::Parse(s) => write!(f, "parse error: {s}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) | Error::OutputIOError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
