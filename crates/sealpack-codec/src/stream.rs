//! Byte stream chain: file-backed endpoints, crypto transforms, and the pump
//!
//! Streams are closed explicitly, innermost first. Ownership enforces the
//! order: [`EncryptionStream::close`] hands back the sink it wrapped, so the
//! final segment and tag are written before the file can be closed.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use sealpack_core::{Compression, OpenFlags};
use sealpack_crypto::SegmentCipher;
use thiserror::Error;

use crate::compression::{CompressWriter, DecompressReader};
use crate::header::PREFIX_LEN;
use crate::segment::{SegmentReader, SegmentWriter};

/// Pump buffer size (64 KiB)
pub const PUMP_BUFFER_SIZE: usize = 64 * 1024;

/// Read-only file stream.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    inner: BufReader<File>,
}

impl FileSource {
    pub fn open(path: &Path, flags: &OpenFlags) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .create(flags.create)
            .truncate(flags.truncate)
            .create_new(flags.exclusive)
            .open(path)?;
        if !file.metadata()?.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        Ok(Self::from_file(file, path))
    }

    /// Wrap an already-open handle, read from its current position.
    pub fn from_file(file: File, path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            inner: BufReader::new(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn close(self) {
        drop(self.inner);
    }
}

impl Read for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Write-only file stream.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    inner: BufWriter<File>,
}

impl FileSink {
    /// Open `path` for writing with `flags`, applying `permissions` (Unix).
    pub fn create(path: &Path, flags: &OpenFlags, permissions: u32) -> io::Result<Self> {
        let mut opts = OpenOptions::new();
        opts.write(true)
            .create(flags.create)
            .truncate(flags.truncate)
            .create_new(flags.exclusive);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            opts.mode(permissions);
        }
        let file = opts.open(path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(permissions))?;
        }
        #[cfg(not(unix))]
        let _ = permissions;

        Ok(Self::from_file(file, path))
    }

    /// Wrap an already-open, writable handle.
    pub fn from_file(file: File, path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            inner: BufWriter::new(file),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered bytes and sync the file to disk. Returns the handle.
    pub fn close(self) -> io::Result<File> {
        let file = self.inner.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(file)
    }
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Compresses then encrypts everything written to it into `W`.
pub struct EncryptionStream<W: Write> {
    inner: CompressWriter<SegmentWriter<W>>,
}

impl<W: Write> EncryptionStream<W> {
    pub(crate) fn new(
        sink: W,
        cipher: SegmentCipher,
        prefix: [u8; PREFIX_LEN],
        segment_size: u32,
        compression: Compression,
        level: i32,
    ) -> io::Result<Self> {
        let segments = SegmentWriter::new(sink, cipher, prefix, segment_size);
        Ok(Self {
            inner: CompressWriter::new(compression, level, segments)?,
        })
    }

    /// Finish compression, write the final authenticated segment, and
    /// return the wrapped sink (still open).
    pub fn close(self) -> io::Result<W> {
        self.inner.finish()?.finish()
    }
}

impl<W: Write> Write for EncryptionStream<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decrypts then decompresses the payload read from `R`.
pub struct DecryptionStream<R: Read> {
    inner: DecompressReader<SegmentReader<R>>,
}

impl<R: Read> DecryptionStream<R> {
    pub(crate) fn new(
        source: R,
        cipher: SegmentCipher,
        prefix: [u8; PREFIX_LEN],
        segment_size: u32,
        compression: Compression,
    ) -> io::Result<Self> {
        let segments = SegmentReader::new(source, cipher, prefix, segment_size);
        Ok(Self {
            inner: DecompressReader::new(compression, segments)?,
        })
    }

    /// Return the wrapped source.
    pub fn close(self) -> R {
        self.inner.into_inner().into_inner()
    }
}

impl<R: Read> Read for DecryptionStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Which side of a pump failed.
#[derive(Debug, Error)]
pub enum PumpError {
    #[error("reading source stream: {0}")]
    Read(#[source] io::Error),

    #[error("writing destination stream: {0}")]
    Write(#[source] io::Error),
}

/// Drain `reader` into `writer` until exhaustion, returning bytes moved.
///
/// Any read or write error stops the pump immediately; nothing read is
/// silently dropped.
pub fn process<R, W>(reader: &mut R, writer: &mut W) -> Result<u64, PumpError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; PUMP_BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(PumpError::Read(e)),
        };
        writer.write_all(&buf[..n]).map_err(PumpError::Write)?;
        total += n as u64;
    }

    writer.flush().map_err(PumpError::Write)?;
    Ok(total)
}
