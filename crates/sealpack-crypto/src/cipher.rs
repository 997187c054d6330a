//! Per-segment AEAD for each profile
//!
//! Segment nonces are never random: every container derives a fresh payload
//! key, so the segment index alone is unique under that key.
//! ```text
//! nonce = segment_index (8 bytes, big-endian) || zero padding to profile nonce length
//! ```
//! Output of `seal` is `[ciphertext][16-byte tag]`.

use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::{
    aead::{Aead, KeyInit, Nonce, Payload},
    XChaCha20Poly1305,
};
use sealpack_core::Profile;
use thiserror::Error;

use crate::TAG_SIZE;

/// Authentication failed. Carries no detail: a wrong key, a tampered
/// ciphertext, and a mismatched AAD are indistinguishable.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("authentication failed")]
pub struct AuthError;

enum Inner {
    XChaCha20Poly1305(XChaCha20Poly1305),
    Aes256Gcm(Aes256Gcm),
    Aes128Gcm(Aes128Gcm),
}

/// A profile's AEAD bound to one derived key.
pub struct SegmentCipher {
    profile: Profile,
    inner: Inner,
}

impl SegmentCipher {
    /// Bind `key` (which must be exactly `profile.key_len()` bytes).
    pub fn new(profile: Profile, key: &[u8]) -> anyhow::Result<Self> {
        if key.len() != profile.key_len() {
            anyhow::bail!(
                "{profile:?} requires a {}-byte key, got {}",
                profile.key_len(),
                key.len()
            );
        }
        let inner = match profile {
            Profile::HkdfSha256XChaCha20Poly1305 => Inner::XChaCha20Poly1305(
                XChaCha20Poly1305::new_from_slice(key)
                    .map_err(|e| anyhow::anyhow!("XChaCha20-Poly1305 key: {e}"))?,
            ),
            Profile::HkdfSha256Aes256Gcm => Inner::Aes256Gcm(
                Aes256Gcm::new_from_slice(key)
                    .map_err(|e| anyhow::anyhow!("AES-256-GCM key: {e}"))?,
            ),
            Profile::HkdfSha256Aes128Gcm => Inner::Aes128Gcm(
                Aes128Gcm::new_from_slice(key)
                    .map_err(|e| anyhow::anyhow!("AES-128-GCM key: {e}"))?,
            ),
        };
        Ok(Self { profile, inner })
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Deterministic nonce for segment `index`.
    pub fn nonce_for(&self, index: u64) -> Vec<u8> {
        let mut nonce = vec![0u8; self.profile.nonce_len()];
        nonce[..8].copy_from_slice(&index.to_be_bytes());
        nonce
    }

    /// Encrypt and authenticate `plaintext`, binding `aad`.
    pub fn seal(&self, nonce: &[u8], aad: &[u8], plaintext: &[u8]) -> anyhow::Result<Vec<u8>> {
        self.check_nonce(nonce)?;
        let payload = Payload {
            msg: plaintext,
            aad,
        };
        let sealed = match &self.inner {
            Inner::XChaCha20Poly1305(c) => {
                c.encrypt(Nonce::<XChaCha20Poly1305>::from_slice(nonce), payload)
            }
            Inner::Aes256Gcm(c) => c.encrypt(Nonce::<Aes256Gcm>::from_slice(nonce), payload),
            Inner::Aes128Gcm(c) => c.encrypt(Nonce::<Aes128Gcm>::from_slice(nonce), payload),
        };
        sealed.map_err(|e| anyhow::anyhow!("segment encryption failed: {e}"))
    }

    /// Verify and decrypt `[ciphertext][tag]`.
    pub fn open(&self, nonce: &[u8], aad: &[u8], sealed: &[u8]) -> Result<Vec<u8>, AuthError> {
        if nonce.len() != self.profile.nonce_len() || sealed.len() < TAG_SIZE {
            return Err(AuthError);
        }
        let payload = Payload { msg: sealed, aad };
        let opened = match &self.inner {
            Inner::XChaCha20Poly1305(c) => {
                c.decrypt(Nonce::<XChaCha20Poly1305>::from_slice(nonce), payload)
            }
            Inner::Aes256Gcm(c) => c.decrypt(Nonce::<Aes256Gcm>::from_slice(nonce), payload),
            Inner::Aes128Gcm(c) => c.decrypt(Nonce::<Aes128Gcm>::from_slice(nonce), payload),
        };
        opened.map_err(|_| AuthError)
    }

    fn check_nonce(&self, nonce: &[u8]) -> anyhow::Result<()> {
        if nonce.len() != self.profile.nonce_len() {
            anyhow::bail!(
                "nonce is {} bytes, {:?} needs {}",
                nonce.len(),
                self.profile,
                self.profile.nonce_len()
            );
        }
        Ok(())
    }
}
