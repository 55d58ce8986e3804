//! **npkit** - a library for extracting NPK/EXPK game asset containers.
//!
//! # Pipeline
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`container`]  | header, 28-byte index records, NXFN name table |
//! | [`crypto::rotor`] | six-rotor stream cipher for `rot`-typed blobs |
//! | [`crypto::cipher`] | the `Cipher` seam for the `EXPK` index/payload cipher |
//! | [`scramble`] | flag-3/flag-4 per-entry XOR codecs |
//! | [`sniff`] | raw-bytes-to-extension content classifier |
//! | [`compression`] | zlib/LZ4/Zstandard decompression dispatch |
//! | [`pipeline`] | per-entry unwrap order (§4.H) |
//! | [`nxs3`] | `de_nxs3` external decoder subprocess contract |
//! | [`output`] | path composition, ZIP expansion, zst dual-write |
//! | [`extract`] | the two-tier parallel extraction driver |

pub mod compression;
pub mod container;
pub mod crypto;
pub mod error;
pub mod extract;
pub mod nxs3;
pub mod output;
pub mod pipeline;
pub(crate) mod scramble;
pub mod sniff;
pub mod utils;

pub use error::{Error, Result};
