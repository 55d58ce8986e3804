//! `de_nxs3` external decoder subprocess contract.
//!
//! `nxs3`-typed blobs (sniffed from the `4E 58 53 33 03 00 00 01` offset
//! signature) are not decoded in-process. Instead `npkit` shells out to a
//! `de_nxs3` binary on `PATH`, writing the raw buffer to a temp file and
//! reading the tool's own output file back. The tool's internal format
//! and algorithm are not specified here - only the invocation contract.

use std::process::Command;

use tempfile::NamedTempFile;

use crate::{Error, Result};

/// How an [`NxS3Decoder`] should behave when the `de_nxs3` subprocess
/// fails (non-zero exit or missing output file).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Return the raw, still-`nxs3`-sniffed buffer unchanged so the
    /// caller can inspect it. Matches the reference tool's default.
    Degrade,
    /// Surface [`Error::ExternalToolError`] instead.
    Fail,
}

impl Default for OnFailure {
    fn default() -> Self {
        OnFailure::Degrade
    }
}

/// Invokes `de_nxs3 <input> <output>` and reads the result back.
pub struct NxS3Decoder {
    binary: String,
    on_failure: OnFailure,
}

impl NxS3Decoder {
    pub fn new(binary: impl Into<String>, on_failure: OnFailure) -> Self {
        NxS3Decoder {
            binary: binary.into(),
            on_failure,
        }
    }

    /// Decode `data` through the external tool.
    ///
    /// On subprocess failure, returns either the original `data`
    /// (unchanged) or an error, per `self.on_failure`.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self.try_decode(data) {
            Ok(decoded) => Ok(decoded),
            Err(e) => match self.on_failure {
                OnFailure::Degrade => {
                    tracing::warn!(error = %e, "de_nxs3 failed, writing raw buffer");
                    Ok(data.to_vec())
                }
                OnFailure::Fail => Err(e),
            },
        }
    }

    fn try_decode(&self, data: &[u8]) -> Result<Vec<u8>> {
        let input = write_temp(data)?;
        let output = NamedTempFile::new().map_err(Error::Io)?;

        let status = Command::new(&self.binary)
            .arg(input.path())
            .arg(output.path())
            .status()
            .map_err(|e| Error::ExternalToolError(format!("failed to spawn {}: {e}", self.binary)))?;

        if !status.success() {
            return Err(Error::ExternalToolError(format!(
                "{} exited with {status}",
                self.binary
            )));
        }

        std::fs::read(output.path())
            .map_err(|e| Error::ExternalToolError(format!("reading de_nxs3 output: {e}")))
    }
}

fn write_temp(data: &[u8]) -> Result<NamedTempFile> {
    use std::io::Write;
    let mut file = NamedTempFile::new().map_err(Error::Io)?;
    file.write_all(data).map_err(Error::Io)?;
    file.flush().map_err(Error::Io)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_degrades_by_default() {
        let decoder = NxS3Decoder::new("definitely-not-a-real-binary-xyz", OnFailure::Degrade);
        let data = b"nxs3 payload".to_vec();
        assert_eq!(decoder.decode(&data).unwrap(), data);
    }

    #[test]
    fn missing_binary_fails_when_configured() {
        let decoder = NxS3Decoder::new("definitely-not-a-real-binary-xyz", OnFailure::Fail);
        assert!(decoder.decode(b"nxs3 payload").is_err());
    }
}
