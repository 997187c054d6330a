//! Key derivation: Argon2id passphrase → key, HKDF-SHA256 key → sub-keys

use argon2::{Algorithm, Argon2, Params, Version};
use hkdf::Hkdf;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::keys::SymmetricKey;

/// Argon2id parameters for passphrase derivation
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Derive a symmetric key of `len` bytes from a passphrase using Argon2id.
///
/// The salt should be 16 random bytes kept alongside whatever the caller
/// uses to find the container again; it does not need to be secret.
pub fn derive_key_from_passphrase(
    passphrase: &SecretString,
    salt: &[u8; 16],
    params: &KdfParams,
    len: usize,
) -> anyhow::Result<SymmetricKey> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(len),
    )
    .map_err(|e| anyhow::anyhow!("invalid Argon2id params: {e}"))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = vec![0u8; len];
    argon2
        .hash_password_into(passphrase.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| anyhow::anyhow!("Argon2id KDF failed: {e}"))?;

    Ok(SymmetricKey::from_bytes(key)?)
}

/// HKDF-SHA256 sub-key derivation with a per-container salt and a
/// domain-specific info string.
pub fn derive_subkey(
    key: &SymmetricKey,
    salt: &[u8],
    info: &[u8],
    len: usize,
) -> anyhow::Result<Zeroizing<Vec<u8>>> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), key.as_bytes());
    let mut okm = Zeroizing::new(vec![0u8; len]);
    hkdf.expand(info, &mut okm)
        .map_err(|e| anyhow::anyhow!("HKDF expand failed: {e}"))?;
    Ok(okm)
}
