//! sealpack-crypto: key material and the AEAD primitives behind each profile
//!
//! Key schedule for one container:
//! ```text
//! SymmetricKey (128/256-bit, caller-supplied or generated)
//!   ├── Header Key  = HKDF-SHA256(key, salt, "sealpack header"  || profile id)
//!   │   └── seals the empty message with AAD = header prefix (key check + header integrity)
//!   └── Payload Key = HKDF-SHA256(key, salt, "sealpack payload" || profile id)
//!       └── Segment AEAD: nonce = segment index (u64 BE, zero-padded), AAD = header prefix || index || kind
//! ```
//!
//! The salt is 32 random bytes drawn per container, so a reused symmetric key
//! still yields single-use header and payload keys.

pub mod cipher;
pub mod kdf;
pub mod keys;

pub use cipher::{AuthError, SegmentCipher};
pub use kdf::{derive_key_from_passphrase, derive_subkey, KdfParams};
pub use keys::{KeyError, SymmetricKey};

/// Size of a per-container HKDF salt
pub const SALT_SIZE: usize = 32;

/// Size of every profile's authentication tag
pub const TAG_SIZE: usize = 16;
