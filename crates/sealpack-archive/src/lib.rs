//! sealpack-archive: seal in-memory objects into encrypted, compressed
//! containers on disk and recover them with the same key.
//!
//! ```text
//! encrypt: object → bytes → staged plaintext file → [zstd → AEAD segments] → container file
//! decrypt: container file → header → context → [AEAD segments → zstd] → staged file → bytes → object
//! ```
//!
//! The container header carries the profile and compression, so decryption
//! needs only the key.

pub mod processor;
pub mod staging;

pub use processor::ArchiveProcessor;
pub use staging::{delete_file, StagedFile, StagingArea};

pub use sealpack_core::{
    Archivable, ArchiveError, ArchiveResult, Compression, Json, OpenFlags, ProcessorConfig, Profile,
};
pub use sealpack_crypto::SymmetricKey;
