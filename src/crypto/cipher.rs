//! The EXPK index/payload cipher seam.
//!
//! `EXPK` containers wrap their raw index block and each entry's raw
//! payload in an additional symmetric cipher before any of the other
//! pipeline stages apply. The algorithm and key material are proprietary
//! and explicitly out of scope here: this module defines the seam
//! ([`Cipher`]) that a caller supplies an implementation through, and
//! nothing else. `npkit` ships no production `Cipher`.
//!
//! Callers parsing real `EXPK` containers bring their own [`Cipher`];
//! callers that only need `NXPK` containers never touch this module.

use crate::Result;

/// A byte-in/byte-out symmetric decryption applied to an `EXPK`
/// container's index block and entry payloads.
///
/// Implementations are expected to operate in fixed-size blocks
/// internally but must accept and return buffers of arbitrary length -
/// the pipeline does not align reads to a block boundary on the caller's
/// behalf.
pub trait Cipher: Send + Sync {
    /// Decrypt `data` in place, returning the plaintext. Must return a
    /// buffer of the same length as `data`; implementations that cannot
    /// guarantee this should pad or report [`crate::Error::IndexDecryptFailure`]
    /// rather than silently truncating or extending it.
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// A transparent [`Cipher`] that returns its input unchanged.
///
/// Exists only so callers who have no `EXPK` key material can still
/// construct a pipeline generic over [`Cipher`] (e.g. when only `NXPK`
/// containers are expected at runtime but the type must still be
/// supplied). Using this against a real `EXPK` container will not
/// recover the plaintext.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityCipher;

impl Cipher for IdentityCipher {
    fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A minimal stand-in `Cipher` used only by this crate's own tests to
    //! exercise the `EXPK` code path end-to-end. This is not the real
    //! cipher used by any shipped container format and must never be
    //! relied on to decrypt real `EXPK` data.

    use super::Cipher;
    use crate::Result;

    /// Fixed-size-block XOR cipher, keyed by a caller-supplied byte
    /// string repeated to cover the buffer. Deliberately not
    /// cryptographically meaningful.
    pub struct StandInCipher {
        key: Vec<u8>,
    }

    impl StandInCipher {
        pub fn new(key: &[u8]) -> Self {
            StandInCipher { key: key.to_vec() }
        }
    }

    impl Cipher for StandInCipher {
        fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
            Ok(data
                .iter()
                .enumerate()
                .map(|(i, &b)| b ^ self.key[i % self.key.len()])
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::StandInCipher;
    use super::*;

    #[test]
    fn identity_cipher_is_noop() {
        let cipher = IdentityCipher;
        let data = b"unchanged".to_vec();
        assert_eq!(cipher.decrypt(&data).unwrap(), data);
    }

    #[test]
    fn stand_in_cipher_is_involution_when_reapplied() {
        let cipher = StandInCipher::new(b"key");
        let plaintext = b"expk index block contents".to_vec();
        let wrapped = cipher.decrypt(&plaintext).unwrap();
        assert_ne!(wrapped, plaintext);
        let unwrapped = cipher.decrypt(&wrapped).unwrap();
        assert_eq!(unwrapped, plaintext);
    }
}
