//! Archive processor: object ⇄ sealed container file.
//!
//! Each call is one sequential unit of blocking file and crypto work, run on
//! tokio's blocking pool. Stream construction is checked in a fixed order
//! (file stream, then context, then crypto stream) so the reported error is
//! always the earliest failing stage.
//!
//! Dropping the future returned by [`ArchiveProcessor::encrypt_object`] or
//! [`ArchiveProcessor::decrypt_object`] does not stop the worker; a partially
//! written destination must be treated as untrusted.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use sealpack_codec::{process, CodecError, EncryptionContext, FileSink, FileSource, PumpError};
use sealpack_core::{Archivable, ArchiveError, ArchiveResult, ProcessorConfig};
use sealpack_crypto::SymmetricKey;
use tracing::{debug, info, warn};

use crate::staging::{StagedFile, StagingArea};

#[derive(Debug, Clone)]
pub struct ArchiveProcessor {
    config: Arc<ProcessorConfig>,
    staging: StagingArea,
}

impl ArchiveProcessor {
    /// Validate `config` and build a processor. Staging goes to
    /// `config.staging_dir` when set, else the process-wide area.
    pub fn new(config: ProcessorConfig) -> ArchiveResult<Self> {
        config.validate()?;
        let staging = match &config.staging_dir {
            Some(dir) => StagingArea::new(dir),
            None => StagingArea::global(),
        };
        Ok(Self {
            config: Arc::new(config),
            staging,
        })
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Seal `object` under `key` into the file at `destination`.
    ///
    /// The destination is opened with the configured write options and
    /// permissions. Returns `Ok(true)` once the container is fully written
    /// and synced.
    pub async fn encrypt_object<T: Archivable>(
        &self,
        object: &T,
        key: &SymmetricKey,
        destination: impl AsRef<Path>,
    ) -> ArchiveResult<bool> {
        let data = object
            .to_bytes()
            .filter(|d| !d.is_empty())
            .ok_or(ArchiveError::ZeroDataSize)?;
        let this = self.clone();
        let key = key.clone();
        let destination = destination.as_ref().to_path_buf();

        run_blocking(move || this.encrypt_bytes_blocking(&data, &key, &destination)).await?;
        Ok(true)
    }

    /// Open the container at `source` with `key` and rebuild a `T` from the
    /// recovered bytes. Profile and compression come from the container.
    pub async fn decrypt_object<T>(
        &self,
        source: impl AsRef<Path>,
        key: &SymmetricKey,
    ) -> ArchiveResult<T>
    where
        T: Archivable + Send + 'static,
    {
        let this = self.clone();
        let key = key.clone();
        let source = source.as_ref().to_path_buf();

        run_blocking(move || this.decrypt_object_blocking(&source, &key)).await
    }

    /// Blocking form of [`decrypt_object`](Self::decrypt_object).
    pub fn decrypt_object_blocking<T: Archivable>(
        &self,
        source: &Path,
        key: &SymmetricKey,
    ) -> ArchiveResult<T> {
        let bytes = self.decrypt_bytes_blocking(source, key)?;
        T::from_bytes(&bytes).ok_or(ArchiveError::UnableToGetHeaderField)
    }

    /// Blocking encrypt pipeline:
    /// stage plaintext → bind key → open streams → pump → close → unstage.
    pub fn encrypt_bytes_blocking(
        &self,
        data: &[u8],
        key: &SymmetricKey,
        destination: &Path,
    ) -> ArchiveResult<()> {
        if data.is_empty() {
            return Err(ArchiveError::ZeroDataSize);
        }
        self.check_thresholds(data.len() as u64);

        let (staged, plaintext) = self.stage_plaintext(data)?;

        let mut ctx = EncryptionContext::new(self.config.profile, self.config.compression)
            .with_compression_level(self.config.compression_level)
            .with_segment_size(self.config.segment_size);
        ctx.set_symmetric_key(key.clone()).map_err(key_error)?;

        let sink = FileSink::create(
            destination,
            &self.config.write_options,
            self.config.permissions,
        )
        .map_err(|e| {
            debug!(path = %destination.display(), error = %e, "destination open failed");
            ArchiveError::file_stream(destination)
        })?;
        let mut source = FileSource::from_file(plaintext, staged.path());
        let mut enc = ctx.open_encryption_stream(sink).map_err(|e| {
            debug!(error = %e, "encryption stream open failed");
            ArchiveError::UnableToCreateEncryptionStream
        })?;

        let moved = process(&mut source, &mut enc).map_err(|e| {
            debug!(error = %e, "encrypt pump failed");
            ArchiveError::UnableToCreateEncryptionStream
        })?;

        let sink = enc
            .close()
            .map_err(|_| ArchiveError::UnableToCreateEncryptionStream)?;
        sink.close()
            .map_err(|_| ArchiveError::file_stream(destination))?;
        source.close();

        unstage(staged);
        info!(
            path = %destination.display(),
            bytes = moved,
            profile = ?self.config.profile,
            compression = ?self.config.compression,
            "object encrypted"
        );
        Ok(())
    }

    /// Blocking decrypt pipeline:
    /// stage path → open source → header context → bind key → decryption
    /// stream → pump into staging → close → read back → unstage.
    pub fn decrypt_bytes_blocking(
        &self,
        source: &Path,
        key: &SymmetricKey,
    ) -> ArchiveResult<Vec<u8>> {
        let staged = self
            .staging
            .stage()
            .map_err(|_| ArchiveError::file_stream(self.staging.root()))?;

        let mut reader = FileSource::open(source, &self.config.read_options).map_err(|e| {
            debug!(path = %source.display(), error = %e, "source open failed");
            ArchiveError::file_stream(source)
        })?;

        let mut ctx = EncryptionContext::from_header(&mut reader).map_err(|e| {
            debug!(path = %source.display(), error = %e, "container header rejected");
            ArchiveError::UnableToCreateDecryptionContext
        })?;
        ctx.set_symmetric_key(key.clone()).map_err(key_error)?;

        let mut dec = ctx.open_decryption_stream(reader).map_err(|e| {
            debug!(error = %e, "decryption stream open failed");
            ArchiveError::UnableToCreateDecodeStream
        })?;

        let staged_file = staged
            .create()
            .map_err(|_| ArchiveError::file_stream(staged.path()))?;
        let mut sink = FileSink::from_file(staged_file, staged.path());

        process(&mut dec, &mut sink).map_err(|e| match e {
            PumpError::Read(e) => {
                debug!(error = %e, "decrypt pump failed");
                ArchiveError::UnableToCreateDecodeStream
            }
            PumpError::Write(_) => ArchiveError::file_stream(staged.path()),
        })?;

        let staged_file = sink
            .close()
            .map_err(|_| ArchiveError::file_stream(staged.path()))?;
        dec.close().close();

        let bytes = read_back(staged_file).map_err(|e| {
            debug!(path = %staged.path().display(), error = %e, "staging read failed");
            ArchiveError::file_stream(staged.path())
        })?;
        unstage(staged);

        self.check_thresholds(bytes.len() as u64);
        info!(path = %source.display(), bytes = bytes.len(), "object decrypted");
        Ok(bytes)
    }

    /// Write `data` to a fresh staging file and return the handle rewound
    /// to the start, ready to be read as the pipeline source.
    fn stage_plaintext(&self, data: &[u8]) -> ArchiveResult<(StagedFile, File)> {
        let staged = self
            .staging
            .stage()
            .map_err(|_| ArchiveError::file_stream(self.staging.root()))?;
        let write = || -> std::io::Result<File> {
            let mut sink = FileSink::from_file(staged.create()?, staged.path());
            sink.write_all(data)?;
            let mut file = sink.close()?;
            file.seek(SeekFrom::Start(0))?;
            Ok(file)
        };
        let file = write().map_err(|e| {
            debug!(path = %staged.path().display(), error = %e, "staging write failed");
            ArchiveError::file_stream(staged.path())
        })?;
        debug!(path = %staged.path().display(), bytes = data.len(), "plaintext staged");
        Ok((staged, file))
    }

    fn check_thresholds(&self, len: u64) {
        if len > self.config.max_in_memory_file_size {
            warn!(
                bytes = len,
                limit = self.config.max_in_memory_file_size,
                "payload exceeds in-memory threshold"
            );
        } else if len > self.config.cpu_threshold {
            debug!(bytes = len, threshold = self.config.cpu_threshold, "large payload");
        }
    }
}

/// Read a staging file back through the handle that wrote it.
fn read_back(mut file: File) -> std::io::Result<Vec<u8>> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn key_error(e: CodecError) -> ArchiveError {
    ArchiveError::InvalidConfiguration(e.to_string())
}

fn unstage(staged: StagedFile) {
    let path = staged.path().to_path_buf();
    if let Err(e) = staged.remove() {
        warn!(path = %path.display(), error = %e, "failed to remove staging file");
    }
}

/// Run `f` on the blocking pool. A panic in `f` is resumed on the caller.
async fn run_blocking<F, R>(f: F) -> ArchiveResult<R>
where
    F: FnOnce() -> ArchiveResult<R> + Send + 'static,
    R: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(ArchiveError::TaskAborted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sealpack_core::Compression;

    fn processor(dir: &Path) -> ArchiveProcessor {
        ArchiveProcessor::new(ProcessorConfig::default().with_staging_dir(dir.join("staging")))
            .unwrap()
    }

    fn staging_is_empty(p: &ArchiveProcessor) -> bool {
        match std::fs::read_dir(p.staging().root()) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ProcessorConfig {
            permissions: 0o17777,
            ..ProcessorConfig::default()
        };
        assert!(matches!(
            ArchiveProcessor::new(config),
            Err(ArchiveError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_default_staging_is_global() {
        let p = ArchiveProcessor::new(ProcessorConfig::default()).unwrap();
        assert_eq!(p.staging(), &StagingArea::global());
    }

    #[test]
    fn test_blocking_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path());
        let key = SymmetricKey::generate_256();
        let dest = dir.path().join("blob.spak");

        p.encrypt_bytes_blocking(b"blocking path", &key, &dest).unwrap();
        assert_eq!(p.decrypt_bytes_blocking(&dest, &key).unwrap(), b"blocking path");
        assert!(staging_is_empty(&p));
    }

    #[test]
    fn test_blocking_rejects_empty() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path());
        let dest = dir.path().join("empty.spak");
        let err = p
            .encrypt_bytes_blocking(&[], &SymmetricKey::generate_256(), &dest)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::ZeroDataSize));
        assert!(!dest.exists());
    }

    #[test]
    fn test_stored_compression_container_is_larger_than_payload() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProcessorConfig::default()
            .with_compression(Compression::None)
            .with_staging_dir(dir.path().join("staging"));
        let p = ArchiveProcessor::new(config).unwrap();
        let key = SymmetricKey::generate_256();
        let dest = dir.path().join("stored.spak");
        let payload = vec![0u8; 10_000];

        p.encrypt_bytes_blocking(&payload, &key, &dest).unwrap();
        assert!(std::fs::metadata(&dest).unwrap().len() > payload.len() as u64);
        assert_eq!(p.decrypt_bytes_blocking(&dest, &key).unwrap(), payload);
    }

    #[test]
    fn test_directory_source_is_a_file_stream_error() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path());
        let err = p
            .decrypt_bytes_blocking(dir.path(), &SymmetricKey::generate_256())
            .unwrap_err();
        match err {
            ArchiveError::UnableToCreateFileStream { path } => assert_eq!(path, dir.path()),
            other => panic!("expected file stream error, got {other:?}"),
        }
        assert!(staging_is_empty(&p));
    }

    #[test]
    fn test_failed_encrypt_leaves_no_staging() {
        let dir = tempfile::tempdir().unwrap();
        let p = processor(dir.path());
        let dest = dir.path().join("no/such/dir/out.spak");
        let err = p
            .encrypt_bytes_blocking(b"data", &SymmetricKey::generate_256(), &dest)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::UnableToCreateFileStream { .. }));
        assert!(staging_is_empty(&p));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_arbitrary_payloads_roundtrip(
            data in proptest::collection::vec(any::<u8>(), 1..=20_000),
            segment_size in 1024u32..=4096,
        ) {
            let dir = tempfile::tempdir().unwrap();
            let config = ProcessorConfig {
                segment_size,
                ..ProcessorConfig::default()
            }
            .with_staging_dir(dir.path().join("staging"));
            let p = ArchiveProcessor::new(config).unwrap();
            let key = SymmetricKey::generate_256();
            let dest = dir.path().join("prop.spak");

            p.encrypt_bytes_blocking(&data, &key, &dest).unwrap();
            let out = p.decrypt_bytes_blocking(&dest, &key).unwrap();
            prop_assert_eq!(out, data);
            prop_assert!(staging_is_empty(&p));
        }
    }
}
