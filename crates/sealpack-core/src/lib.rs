pub mod archivable;
pub mod config;
pub mod error;
pub mod types;

pub use archivable::{Archivable, Json};
pub use config::ProcessorConfig;
pub use error::{ArchiveError, ArchiveResult};
pub use types::{Compression, OpenFlags, Profile, SignatureScheme};
