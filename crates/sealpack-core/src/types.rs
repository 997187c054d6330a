use serde::{Deserialize, Serialize};

/// Algorithm profile: key derivation + cipher + authentication.
///
/// The discriminant is the profile's wire id in a container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum Profile {
    /// HKDF-SHA256 sub-keys, XChaCha20-Poly1305 segments
    #[default]
    #[serde(rename = "hkdf-sha256-xchacha20-poly1305")]
    HkdfSha256XChaCha20Poly1305 = 1,
    /// HKDF-SHA256 sub-keys, AES-256-GCM segments
    #[serde(rename = "hkdf-sha256-aes256-gcm")]
    HkdfSha256Aes256Gcm = 2,
    /// HKDF-SHA256 sub-keys, AES-128-GCM segments
    #[serde(rename = "hkdf-sha256-aes128-gcm")]
    HkdfSha256Aes128Gcm = 3,
}

/// Asymmetric signature scheme carried by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    Ed25519,
}

impl Profile {
    pub const ALL: [Profile; 3] = [
        Profile::HkdfSha256XChaCha20Poly1305,
        Profile::HkdfSha256Aes256Gcm,
        Profile::HkdfSha256Aes128Gcm,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }

    /// Symmetric key length in bytes
    pub fn key_len(self) -> usize {
        match self {
            Profile::HkdfSha256XChaCha20Poly1305 | Profile::HkdfSha256Aes256Gcm => 32,
            Profile::HkdfSha256Aes128Gcm => 16,
        }
    }

    pub fn nonce_len(self) -> usize {
        match self {
            Profile::HkdfSha256XChaCha20Poly1305 => 24,
            Profile::HkdfSha256Aes256Gcm | Profile::HkdfSha256Aes128Gcm => 12,
        }
    }

    pub fn tag_len(self) -> usize {
        16
    }

    /// None of the symmetric profiles sign their containers.
    pub fn signature_scheme(self) -> Option<SignatureScheme> {
        None
    }
}

/// Compression applied to the payload before encryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Compression {
    None = 0,
    #[default]
    Zstd = 1,
}

impl Compression {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Compression::None),
            1 => Some(Compression::Zstd),
            _ => None,
        }
    }
}

/// Open-option flags applied when a file stream is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenFlags {
    /// Create the file if it does not exist
    pub create: bool,
    /// Truncate an existing file to zero length
    pub truncate: bool,
    /// Fail if the file already exists (implies create)
    pub exclusive: bool,
}

impl OpenFlags {
    pub const NONE: OpenFlags = OpenFlags {
        create: false,
        truncate: false,
        exclusive: false,
    };

    pub const CREATE_TRUNCATE: OpenFlags = OpenFlags {
        create: true,
        truncate: true,
        exclusive: false,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_ids_roundtrip() {
        for p in Profile::ALL {
            assert_eq!(Profile::from_id(p.id()), Some(p));
        }
        assert_eq!(Profile::from_id(0), None);
        assert_eq!(Profile::from_id(4), None);
    }

    #[test]
    fn test_key_lengths() {
        assert_eq!(Profile::HkdfSha256XChaCha20Poly1305.key_len(), 32);
        assert_eq!(Profile::HkdfSha256Aes256Gcm.key_len(), 32);
        assert_eq!(Profile::HkdfSha256Aes128Gcm.key_len(), 16);
        assert!(Profile::ALL.iter().all(|p| p.signature_scheme().is_none()));
    }

    #[test]
    fn test_compression_ids() {
        assert_eq!(Compression::from_id(0), Some(Compression::None));
        assert_eq!(Compression::from_id(1), Some(Compression::Zstd));
        assert_eq!(Compression::from_id(9), None);
    }
}
