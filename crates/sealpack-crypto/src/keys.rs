//! Symmetric key material: generation, validation, zeroization

use rand::RngCore;
use sealpack_core::Profile;
use thiserror::Error;
use zeroize::Zeroize;

/// Key lengths accepted by any profile (128 and 256 bits).
pub const VALID_KEY_LENGTHS: [usize; 2] = [16, 32];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid key length: {0} bytes (expected 16 or 32)")]
    InvalidLength(usize),
}

/// A 128- or 256-bit symmetric key. Zeroized on drop.
///
/// Lives only for the duration of one encrypt/decrypt call; nothing in this
/// workspace persists it.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey {
    bytes: Vec<u8>,
}

impl SymmetricKey {
    /// Wrap existing key material, rejecting lengths other than 16 or 32 bytes.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self, KeyError> {
        if !VALID_KEY_LENGTHS.contains(&bytes.len()) {
            let len = bytes.len();
            bytes.zeroize();
            return Err(KeyError::InvalidLength(len));
        }
        Ok(Self { bytes })
    }

    /// Generate `len` bytes of fresh key material from the thread RNG.
    pub fn generate(len: usize) -> Result<Self, KeyError> {
        if !VALID_KEY_LENGTHS.contains(&len) {
            return Err(KeyError::InvalidLength(len));
        }
        let mut bytes = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut bytes);
        Ok(Self { bytes })
    }

    /// Generate a key sized for `profile`.
    pub fn generate_for(profile: Profile) -> Self {
        let mut bytes = vec![0u8; profile.key_len()];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Generate a random 256-bit key.
    pub fn generate_256() -> Self {
        let mut bytes = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bits(&self) -> usize {
        self.bytes.len() * 8
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bits", &self.bits())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
