use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ArchiveError, ArchiveResult};
use crate::types::{Compression, OpenFlags, Profile};

/// Smallest plaintext segment a container may declare (1 KiB)
pub const MIN_SEGMENT_SIZE: u32 = 1024;

/// Largest plaintext segment a container may declare (16 MiB)
pub const MAX_SEGMENT_SIZE: u32 = 16 * 1024 * 1024;

/// Default plaintext segment size (64 KiB)
pub const DEFAULT_SEGMENT_SIZE: u32 = 64 * 1024;

/// Default zstd level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Immutable settings for one `ArchiveProcessor`.
///
/// Shared read-only across every call the processor serves; per-call
/// encryption contexts are built from `profile` and `compression`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Algorithm profile for new containers
    pub profile: Profile,
    /// Payload compression for new containers
    pub compression: Compression,
    /// zstd level (1-22), ignored when compression is `none`
    pub compression_level: i32,
    /// Plaintext bytes per encrypted segment
    pub segment_size: u32,
    /// Permission bits applied to created files (Unix only)
    pub permissions: u32,
    /// Advisory: payloads above this size are expected to stage through disk
    pub max_in_memory_file_size: u64,
    /// Advisory: payloads above this size are worth moving off the caller's thread
    pub cpu_threshold: u64,
    /// Overrides the process-wide staging directory
    pub staging_dir: Option<PathBuf>,
    /// Flags used when opening files for reading
    pub read_options: OpenFlags,
    /// Flags used when opening files for writing (default: create + truncate)
    pub write_options: OpenFlags,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            compression: Compression::default(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            segment_size: DEFAULT_SEGMENT_SIZE,
            permissions: 0o600,
            max_in_memory_file_size: 16 * 1024 * 1024,
            cpu_threshold: 4 * 1024 * 1024,
            staging_dir: None,
            read_options: OpenFlags::NONE,
            write_options: OpenFlags::CREATE_TRUNCATE,
        }
    }
}

impl ProcessorConfig {
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Reject internally inconsistent settings.
    pub fn validate(&self) -> ArchiveResult<()> {
        if self.permissions > 0o7777 {
            return Err(ArchiveError::config(format!(
                "permissions {:#o} exceed 0o7777",
                self.permissions
            )));
        }
        if !(MIN_SEGMENT_SIZE..=MAX_SEGMENT_SIZE).contains(&self.segment_size) {
            return Err(ArchiveError::config(format!(
                "segment_size {} outside {MIN_SEGMENT_SIZE}..={MAX_SEGMENT_SIZE}",
                self.segment_size
            )));
        }
        if self.compression == Compression::Zstd && !(1..=22).contains(&self.compression_level) {
            return Err(ArchiveError::config(format!(
                "compression_level {} outside 1..=22",
                self.compression_level
            )));
        }
        if !self.read_options.is_empty() {
            return Err(ArchiveError::config(
                "read_options cannot create, truncate, or require exclusivity",
            ));
        }
        if !self.write_options.create && !self.write_options.exclusive {
            return Err(ArchiveError::config(
                "write_options must allow creating the destination",
            ));
        }
        if !self.write_options.truncate && !self.write_options.exclusive {
            return Err(ArchiveError::config(
                "write_options must truncate or require a new file",
            ));
        }
        if self.write_options.exclusive && self.write_options.truncate {
            return Err(ArchiveError::config(
                "write_options cannot combine exclusive with truncate",
            ));
        }
        if self.cpu_threshold > self.max_in_memory_file_size {
            tracing::warn!(
                cpu_threshold = self.cpu_threshold,
                max_in_memory_file_size = self.max_in_memory_file_size,
                "cpu_threshold exceeds max_in_memory_file_size"
            );
        }
        Ok(())
    }
}
