use std::path::PathBuf;

use thiserror::Error;

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Failures surfaced by the archive processor.
///
/// Authentication failures are deliberately collapsed into
/// [`ArchiveError::UnableToCreateDecodeStream`]: a wrong key and a tampered
/// container report the same kind.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("object has no data to archive")]
    ZeroDataSize,

    #[error("unable to open file stream: {}", path.display())]
    UnableToCreateFileStream { path: PathBuf },

    #[error("unable to create decryption context from container header")]
    UnableToCreateDecryptionContext,

    #[error("unable to create decode stream")]
    UnableToCreateDecodeStream,

    #[error("unable to create encryption stream")]
    UnableToCreateEncryptionStream,

    #[error("decrypted data could not be reconstructed into the requested type")]
    UnableToGetHeaderField,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The blocking worker was torn down before it ran, which only happens
    /// when the tokio runtime shuts down mid-call. Not part of the pipeline's
    /// own failure set: no stage produces it.
    #[error("archive task aborted before completion (runtime shutting down)")]
    TaskAborted,
}

impl ArchiveError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ArchiveError::InvalidConfiguration(msg.into())
    }

    pub fn file_stream(path: impl Into<PathBuf>) -> Self {
        ArchiveError::UnableToCreateFileStream { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_stream_message_carries_no_detail() {
        let msg = ArchiveError::UnableToCreateDecodeStream.to_string();
        assert_eq!(msg, "unable to create decode stream");
    }

    #[test]
    fn test_task_aborted_names_runtime_shutdown() {
        let msg = ArchiveError::TaskAborted.to_string();
        assert!(msg.contains("runtime shutting down"), "{msg}");
    }

    #[test]
    fn test_file_stream_error_names_path() {
        let err = ArchiveError::file_stream("/tmp/missing.spak");
        assert!(err.to_string().contains("/tmp/missing.spak"));
    }
}
