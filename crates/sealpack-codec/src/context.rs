//! Encryption context: profile + compression bound to a symmetric key
//!
//! A context opens exactly one stream. Fresh contexts (from
//! [`EncryptionContext::new`]) draw a new salt and may only encrypt;
//! contexts read from a container header (from
//! [`EncryptionContext::from_header`]) carry that container's salt and tag
//! and may only decrypt. Opening a stream consumes the context.

use std::io::{Read, Write};

use rand::RngCore;
use sealpack_core::config::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_SEGMENT_SIZE};
use sealpack_core::{Compression, Profile};
use sealpack_crypto::{derive_subkey, SegmentCipher, SymmetricKey, SALT_SIZE, TAG_SIZE};

use crate::error::CodecError;
use crate::header::{ContainerHeader, PREFIX_LEN};
use crate::stream::{DecryptionStream, EncryptionStream};

const HEADER_INFO: &[u8] = b"sealpack header";
const PAYLOAD_INFO: &[u8] = b"sealpack payload";

enum Origin {
    Fresh,
    Container { tag: [u8; TAG_SIZE] },
}

pub struct EncryptionContext {
    header: ContainerHeader,
    compression_level: i32,
    key: Option<SymmetricKey>,
    origin: Origin,
}

impl EncryptionContext {
    /// A fresh context for writing a new container.
    pub fn new(profile: Profile, compression: Compression) -> Self {
        let mut salt = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);
        Self {
            header: ContainerHeader {
                profile,
                compression,
                segment_size: DEFAULT_SEGMENT_SIZE,
                salt,
            },
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            key: None,
            origin: Origin::Fresh,
        }
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Caller is responsible for keeping `segment_size` within the header bounds.
    pub fn with_segment_size(mut self, segment_size: u32) -> Self {
        self.header.segment_size = segment_size;
        self
    }

    /// Discover profile and compression from a container's header.
    ///
    /// Consumes exactly the header bytes from `reader`; hand the same reader
    /// to [`open_decryption_stream`](Self::open_decryption_stream) to
    /// continue at the first payload record.
    pub fn from_header<R: Read + ?Sized>(reader: &mut R) -> Result<Self, CodecError> {
        let (header, tag) = ContainerHeader::read_from(reader)?;
        tracing::debug!(
            profile = ?header.profile,
            compression = ?header.compression,
            segment_size = header.segment_size,
            "context derived from container header"
        );
        Ok(Self {
            header,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            key: None,
            origin: Origin::Container { tag },
        })
    }

    pub fn profile(&self) -> Profile {
        self.header.profile
    }

    pub fn compression(&self) -> Compression {
        self.header.compression
    }

    pub fn segment_size(&self) -> u32 {
        self.header.segment_size
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Fresh key material sized for this context's profile.
    pub fn generate_symmetric_key(&self) -> SymmetricKey {
        SymmetricKey::generate_for(self.header.profile)
    }

    /// Bind `key`, rejecting material whose length the profile cannot use.
    pub fn set_symmetric_key(&mut self, key: SymmetricKey) -> Result<(), CodecError> {
        let expected = self.header.profile.key_len();
        if key.len() != expected {
            return Err(CodecError::KeyLength {
                profile: self.header.profile,
                expected,
                actual: key.len(),
            });
        }
        self.key = Some(key);
        Ok(())
    }

    fn cipher(&self, key: &SymmetricKey, info: &[u8]) -> Result<SegmentCipher, CodecError> {
        let profile = self.header.profile;
        let mut full_info = info.to_vec();
        full_info.push(profile.id());
        let subkey = derive_subkey(key, &self.header.salt, &full_info, profile.key_len())
            .map_err(|e| CodecError::KeySetup(e.to_string()))?;
        SegmentCipher::new(profile, &subkey).map_err(|e| CodecError::KeySetup(e.to_string()))
    }

    fn header_tag(
        &self,
        key: &SymmetricKey,
        prefix: &[u8; PREFIX_LEN],
    ) -> Result<Vec<u8>, CodecError> {
        let cipher = self.cipher(key, HEADER_INFO)?;
        cipher
            .seal(&cipher.nonce_for(0), prefix, &[])
            .map_err(|e| CodecError::KeySetup(e.to_string()))
    }

    /// Write the container header to `sink` and return a stream that
    /// compresses and encrypts everything written to it.
    pub fn open_encryption_stream<W: Write>(
        self,
        mut sink: W,
    ) -> Result<EncryptionStream<W>, CodecError> {
        if matches!(self.origin, Origin::Container { .. }) {
            return Err(CodecError::DerivedContext);
        }
        let key = self.key.as_ref().ok_or(CodecError::NoKey)?;
        let prefix = self.header.prefix();
        let tag = self.header_tag(key, &prefix)?;
        let cipher = self.cipher(key, PAYLOAD_INFO)?;

        sink.write_all(&prefix)?;
        sink.write_all(&tag)?;

        let stream = EncryptionStream::new(
            sink,
            cipher,
            prefix,
            self.header.segment_size,
            self.header.compression,
            self.compression_level,
        )?;
        tracing::debug!(profile = ?self.header.profile, "encryption stream opened");
        Ok(stream)
    }

    /// Verify the header tag under the bound key and return a stream that
    /// decrypts and decompresses the payload read from `source`.
    ///
    /// A wrong key and a tampered header both fail here with
    /// [`CodecError::Auth`].
    pub fn open_decryption_stream<R: Read>(
        self,
        source: R,
    ) -> Result<DecryptionStream<R>, CodecError> {
        let Origin::Container { tag } = self.origin else {
            return Err(CodecError::FreshContext);
        };
        let key = self.key.as_ref().ok_or(CodecError::NoKey)?;
        let prefix = self.header.prefix();

        let header_cipher = self.cipher(key, HEADER_INFO)?;
        header_cipher
            .open(&header_cipher.nonce_for(0), &prefix, &tag)
            .map_err(|_| CodecError::Auth)?;

        let cipher = self.cipher(key, PAYLOAD_INFO)?;
        let stream = DecryptionStream::new(
            source,
            cipher,
            prefix,
            self.header.segment_size,
            self.header.compression,
        )?;
        tracing::debug!(profile = ?self.header.profile, "decryption stream opened");
        Ok(stream)
    }
}

impl std::fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("profile", &self.header.profile)
            .field("compression", &self.header.compression)
            .field("segment_size", &self.header.segment_size)
            .field("derived", &matches!(self.origin, Origin::Container { .. }))
            .field("key", &self.key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn seal(ctx: EncryptionContext, key: &SymmetricKey, data: &[u8]) -> Vec<u8> {
        let mut ctx = ctx;
        ctx.set_symmetric_key(key.clone()).unwrap();
        let mut enc = ctx.open_encryption_stream(Vec::new()).unwrap();
        enc.write_all(data).unwrap();
        enc.close().unwrap()
    }

    fn unseal(container: &[u8], key: &SymmetricKey) -> Result<Vec<u8>, CodecError> {
        let mut source = Cursor::new(container);
        let mut ctx = EncryptionContext::from_header(&mut source)?;
        ctx.set_symmetric_key(key.clone())?;
        let mut dec = ctx.open_decryption_stream(source)?;
        let mut out = Vec::new();
        dec.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn test_roundtrip_every_profile_and_compression() {
        for profile in Profile::ALL {
            for compression in [Compression::None, Compression::Zstd] {
                let ctx = EncryptionContext::new(profile, compression).with_segment_size(1024);
                let key = ctx.generate_symmetric_key();
                let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
                let container = seal(ctx, &key, &data);
                assert_eq!(unseal(&container, &key).unwrap(), data, "{profile:?}/{compression:?}");
            }
        }
    }

    #[test]
    fn test_header_discovers_profile_and_compression() {
        let ctx = EncryptionContext::new(Profile::HkdfSha256Aes128Gcm, Compression::None);
        let key = ctx.generate_symmetric_key();
        assert_eq!(key.len(), 16);
        let container = seal(ctx, &key, b"discover me");

        let derived = EncryptionContext::from_header(&mut Cursor::new(&container)).unwrap();
        assert_eq!(derived.profile(), Profile::HkdfSha256Aes128Gcm);
        assert_eq!(derived.compression(), Compression::None);
        assert_eq!(derived.segment_size(), DEFAULT_SEGMENT_SIZE);
    }

    #[test]
    fn test_wrong_key_fails_at_open() {
        let ctx = EncryptionContext::new(Profile::default(), Compression::Zstd);
        let key = ctx.generate_symmetric_key();
        let container = seal(ctx, &key, b"secret");

        let other = SymmetricKey::generate_256();
        assert!(matches!(unseal(&container, &other), Err(CodecError::Auth)));
    }

    #[test]
    fn test_key_length_mismatch() {
        let mut ctx = EncryptionContext::new(Profile::HkdfSha256Aes128Gcm, Compression::Zstd);
        let err = ctx.set_symmetric_key(SymmetricKey::generate_256()).unwrap_err();
        assert!(matches!(
            err,
            CodecError::KeyLength {
                expected: 16,
                actual: 32,
                ..
            }
        ));
        assert!(!ctx.has_key());
    }

    #[test]
    fn test_open_without_key() {
        let ctx = EncryptionContext::new(Profile::default(), Compression::Zstd);
        assert!(matches!(
            ctx.open_encryption_stream(Vec::new()),
            Err(CodecError::NoKey)
        ));
    }

    #[test]
    fn test_derived_context_cannot_encrypt() {
        let ctx = EncryptionContext::new(Profile::default(), Compression::Zstd);
        let key = ctx.generate_symmetric_key();
        let container = seal(ctx, &key, b"x");

        let mut derived = EncryptionContext::from_header(&mut Cursor::new(&container)).unwrap();
        derived.set_symmetric_key(key).unwrap();
        assert!(matches!(
            derived.open_encryption_stream(Vec::new()),
            Err(CodecError::DerivedContext)
        ));
    }

    #[test]
    fn test_fresh_context_cannot_decrypt() {
        let mut ctx = EncryptionContext::new(Profile::default(), Compression::Zstd);
        ctx.set_symmetric_key(ctx.generate_symmetric_key()).unwrap();
        assert!(matches!(
            ctx.open_decryption_stream(Cursor::new(Vec::new())),
            Err(CodecError::FreshContext)
        ));
    }

    #[test]
    fn test_tampered_header_fails_auth() {
        let ctx = EncryptionContext::new(Profile::default(), Compression::Zstd);
        let key = ctx.generate_symmetric_key();
        let mut container = seal(ctx, &key, b"secret");
        container[20] ^= 0x01; // inside the salt
        assert!(matches!(unseal(&container, &key), Err(CodecError::Auth)));
    }

    #[test]
    fn test_fresh_salts_differ() {
        let key = SymmetricKey::generate_256();
        let a = seal(EncryptionContext::new(Profile::default(), Compression::Zstd), &key, b"same");
        let b = seal(EncryptionContext::new(Profile::default(), Compression::Zstd), &key, b"same");
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_header() {
        let mut garbage = Cursor::new(b"definitely not a container".to_vec());
        let err = EncryptionContext::from_header(&mut garbage).unwrap_err();
        assert!(matches!(err, CodecError::Header(_)));
    }
}
