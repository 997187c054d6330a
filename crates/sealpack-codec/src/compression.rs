//! Streaming compression layer
//!
//! The payload is compressed as one zstd frame before it is split into
//! encrypted segments; `Compression::None` passes bytes through untouched.

use std::io::{self, BufReader, Read, Write};

use sealpack_core::Compression;

/// Compressing writer over `W`.
pub enum CompressWriter<W: Write> {
    Stored(W),
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

impl<W: Write> CompressWriter<W> {
    pub fn new(compression: Compression, level: i32, inner: W) -> io::Result<Self> {
        Ok(match compression {
            Compression::None => CompressWriter::Stored(inner),
            Compression::Zstd => {
                CompressWriter::Zstd(zstd::stream::write::Encoder::new(inner, level)?)
            }
        })
    }

    /// Write the zstd epilogue (if any) and return the inner writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            CompressWriter::Stored(w) => Ok(w),
            CompressWriter::Zstd(enc) => enc.finish(),
        }
    }
}

impl<W: Write> Write for CompressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompressWriter::Stored(w) => w.write(buf),
            CompressWriter::Zstd(enc) => enc.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CompressWriter::Stored(w) => w.flush(),
            CompressWriter::Zstd(enc) => enc.flush(),
        }
    }
}

/// Decompressing reader over `R`.
pub enum DecompressReader<R: Read> {
    Stored(R),
    Zstd(zstd::stream::read::Decoder<'static, BufReader<R>>),
}

impl<R: Read> DecompressReader<R> {
    pub fn new(compression: Compression, inner: R) -> io::Result<Self> {
        Ok(match compression {
            Compression::None => DecompressReader::Stored(inner),
            Compression::Zstd => DecompressReader::Zstd(zstd::stream::read::Decoder::new(inner)?),
        })
    }

    pub fn into_inner(self) -> R {
        match self {
            DecompressReader::Stored(r) => r,
            DecompressReader::Zstd(dec) => dec.finish().into_inner(),
        }
    }
}

impl<R: Read> Read for DecompressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            DecompressReader::Stored(r) => r.read(buf),
            DecompressReader::Zstd(dec) => dec.read(buf),
        }
    }
}
