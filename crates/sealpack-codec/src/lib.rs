//! sealpack-codec: the container format and the byte streams that produce it
//!
//! # Overview
//! - `header`: fixed 60-byte container header (profile, compression, segment size, salt, tag)
//! - `compression`: streaming zstd (or stored) layer under the cipher
//! - `segment`: authenticated record framing of the compressed payload
//! - `context`: `EncryptionContext`, binding a profile and key to one open stream
//! - `stream`: file-backed sources/sinks, encryption/decryption streams, the `process` pump
//!
//! Write side: `plaintext → CompressWriter → SegmentWriter → FileSink`.
//! Read side:  `FileSource → SegmentReader → DecompressReader → plaintext`.

pub mod compression;
pub mod context;
pub mod error;
pub mod header;
pub mod segment;
pub mod stream;

pub use context::EncryptionContext;
pub use error::CodecError;
pub use header::{ContainerHeader, HeaderError, HEADER_LEN};
pub use stream::{process, DecryptionStream, EncryptionStream, FileSink, FileSource, PumpError};
