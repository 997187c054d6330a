//! Container header
//!
//! Header format (binary, 60 bytes):
//! ```text
//! [4 bytes: magic "SPAK"][1: version][1: profile id][1: compression id][1: reserved = 0]
//! [4 bytes: segment size, big-endian][32 bytes: salt]
//! [16 bytes: header tag]
//! ```
//!
//! The first 44 bytes (the prefix) are bound as AAD into the header tag and
//! every payload segment, so no header field can be altered without
//! decryption failing.

use std::io::{self, Read};

use sealpack_core::config::{MAX_SEGMENT_SIZE, MIN_SEGMENT_SIZE};
use sealpack_core::{Compression, Profile};
use sealpack_crypto::{SALT_SIZE, TAG_SIZE};
use thiserror::Error;

pub const MAGIC: [u8; 4] = *b"SPAK";
pub const VERSION: u8 = 1;

/// Bytes covered by the header tag
pub const PREFIX_LEN: usize = 12 + SALT_SIZE;

/// Total header length including the tag
pub const HEADER_LEN: usize = PREFIX_LEN + TAG_SIZE;

#[derive(Debug, Error)]
pub enum HeaderError {
    #[error("header truncated")]
    Truncated,

    #[error("not a sealpack container (bad magic)")]
    BadMagic,

    #[error("unsupported container version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown profile id {0}")]
    UnknownProfile(u8),

    #[error("unknown compression id {0}")]
    UnknownCompression(u8),

    #[error("reserved header byte is {0:#04x}, expected 0")]
    Reserved(u8),

    #[error("segment size {0} out of bounds")]
    SegmentSize(u32),

    #[error("reading header: {0}")]
    Io(#[source] io::Error),
}

/// Decoded header fields (everything but the tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub profile: Profile,
    pub compression: Compression,
    pub segment_size: u32,
    pub salt: [u8; SALT_SIZE],
}

impl ContainerHeader {
    /// Serialize the authenticated prefix.
    pub fn prefix(&self) -> [u8; PREFIX_LEN] {
        let mut out = [0u8; PREFIX_LEN];
        out[..4].copy_from_slice(&MAGIC);
        out[4] = VERSION;
        out[5] = self.profile.id();
        out[6] = self.compression.id();
        out[7] = 0;
        out[8..12].copy_from_slice(&self.segment_size.to_be_bytes());
        out[12..].copy_from_slice(&self.salt);
        out
    }

    /// Parse and validate a prefix.
    pub fn parse_prefix(bytes: &[u8; PREFIX_LEN]) -> Result<Self, HeaderError> {
        if bytes[..4] != MAGIC {
            return Err(HeaderError::BadMagic);
        }
        if bytes[4] != VERSION {
            return Err(HeaderError::UnsupportedVersion(bytes[4]));
        }
        let profile = Profile::from_id(bytes[5]).ok_or(HeaderError::UnknownProfile(bytes[5]))?;
        let compression =
            Compression::from_id(bytes[6]).ok_or(HeaderError::UnknownCompression(bytes[6]))?;
        if bytes[7] != 0 {
            return Err(HeaderError::Reserved(bytes[7]));
        }
        let segment_size = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        if !(MIN_SEGMENT_SIZE..=MAX_SEGMENT_SIZE).contains(&segment_size) {
            return Err(HeaderError::SegmentSize(segment_size));
        }
        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&bytes[12..]);

        Ok(Self {
            profile,
            compression,
            segment_size,
            salt,
        })
    }

    /// Read exactly `HEADER_LEN` bytes from `reader`, leaving it positioned at
    /// the first payload record. Returns the header and its tag.
    pub fn read_from<R: Read + ?Sized>(
        reader: &mut R,
    ) -> Result<(Self, [u8; TAG_SIZE]), HeaderError> {
        let mut prefix = [0u8; PREFIX_LEN];
        read_exact(reader, &mut prefix)?;
        let header = Self::parse_prefix(&prefix)?;
        let mut tag = [0u8; TAG_SIZE];
        read_exact(reader, &mut tag)?;
        Ok((header, tag))
    }
}

fn read_exact<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> Result<(), HeaderError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => HeaderError::Truncated,
        _ => HeaderError::Io(e),
    })
}
