//! Authenticated record framing of the (compressed) payload
//!
//! Record format (binary):
//! ```text
//! [1 byte: kind, 0 = more, 1 = final][4 bytes: sealed length, big-endian][sealed segment]
//! AAD = header prefix (44 bytes) || segment index (8 bytes, big-endian) || kind
//! ```
//!
//! Every `more` record carries exactly `segment_size` plaintext bytes; the
//! single `final` record carries the remainder (possibly nothing). Binding
//! the kind into the AAD makes truncation detectable: a stream that ends
//! without an authenticated `final` record is rejected.

use std::io::{self, Read, Write};

use sealpack_crypto::{SegmentCipher, TAG_SIZE};
use thiserror::Error;

use crate::header::PREFIX_LEN;

pub const RECORD_MORE: u8 = 0;
pub const RECORD_FINAL: u8 = 1;

/// Failures while reading records. Surfaced as `io::ErrorKind::InvalidData`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("container truncated before the final segment")]
    Truncated,

    #[error("data after the final segment")]
    TrailingData,

    #[error("segment of {0} bytes exceeds the declared segment size")]
    Oversized(usize),

    #[error("unknown record kind {0}")]
    UnknownKind(u8),

    #[error("segment authentication failed")]
    Auth,

    #[error("segment counter exhausted")]
    CounterExhausted,
}

impl From<SegmentError> for io::Error {
    fn from(e: SegmentError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, e)
    }
}

pub(crate) fn segment_aad(prefix: &[u8; PREFIX_LEN], index: u64, kind: u8) -> Vec<u8> {
    let mut aad = Vec::with_capacity(PREFIX_LEN + 8 + 1);
    aad.extend_from_slice(prefix);
    aad.extend_from_slice(&index.to_be_bytes());
    aad.push(kind);
    aad
}

/// Buffers plaintext into segments and writes sealed records to `inner`.
///
/// `finish` must be called to emit the final record; dropping the writer
/// leaves a container that readers reject as truncated.
pub struct SegmentWriter<W: Write> {
    inner: W,
    cipher: SegmentCipher,
    prefix: [u8; PREFIX_LEN],
    segment_size: usize,
    buf: Vec<u8>,
    index: u64,
}

impl<W: Write> SegmentWriter<W> {
    pub fn new(
        inner: W,
        cipher: SegmentCipher,
        prefix: [u8; PREFIX_LEN],
        segment_size: u32,
    ) -> Self {
        let segment_size = segment_size as usize;
        Self {
            inner,
            cipher,
            prefix,
            segment_size,
            buf: Vec::with_capacity(segment_size),
            index: 0,
        }
    }

    fn seal_record(&mut self, kind: u8) -> io::Result<()> {
        let aad = segment_aad(&self.prefix, self.index, kind);
        let nonce = self.cipher.nonce_for(self.index);
        let sealed = self
            .cipher
            .seal(&nonce, &aad, &self.buf)
            .map_err(io::Error::other)?;

        self.inner.write_all(&[kind])?;
        self.inner.write_all(&(sealed.len() as u32).to_be_bytes())?;
        self.inner.write_all(&sealed)?;

        self.buf.clear();
        self.index = self
            .index
            .checked_add(1)
            .ok_or(SegmentError::CounterExhausted)?;
        Ok(())
    }

    /// Seal the buffered remainder as the final record and hand back `inner`.
    pub fn finish(mut self) -> io::Result<W> {
        self.seal_record(RECORD_FINAL)?;
        self.inner.flush()?;
        tracing::trace!(segments = self.index, "segment stream finished");
        Ok(self.inner)
    }
}

impl<W: Write> Write for SegmentWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        // A full buffer is only sealed as `more` once we know more data follows.
        if self.buf.len() == self.segment_size {
            self.seal_record(RECORD_MORE)?;
        }
        let n = (self.segment_size - self.buf.len()).min(data.len());
        self.buf.extend_from_slice(&data[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reads sealed records from `inner`, yielding authenticated plaintext.
pub struct SegmentReader<R: Read> {
    inner: R,
    cipher: SegmentCipher,
    prefix: [u8; PREFIX_LEN],
    segment_size: usize,
    index: u64,
    plain: Vec<u8>,
    pos: usize,
    done: bool,
}

impl<R: Read> SegmentReader<R> {
    pub fn new(
        inner: R,
        cipher: SegmentCipher,
        prefix: [u8; PREFIX_LEN],
        segment_size: u32,
    ) -> Self {
        Self {
            inner,
            cipher,
            prefix,
            segment_size: segment_size as usize,
            index: 0,
            plain: Vec::new(),
            pos: 0,
            done: false,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn next_record(&mut self) -> io::Result<()> {
        let mut head = [0u8; 5];
        read_record_part(&mut self.inner, &mut head)?;
        let kind = head[0];
        if kind != RECORD_MORE && kind != RECORD_FINAL {
            return Err(SegmentError::UnknownKind(kind).into());
        }
        let len = u32::from_be_bytes([head[1], head[2], head[3], head[4]]) as usize;
        if len < TAG_SIZE || len > self.segment_size + TAG_SIZE {
            return Err(SegmentError::Oversized(len).into());
        }

        let mut sealed = vec![0u8; len];
        read_record_part(&mut self.inner, &mut sealed)?;

        let aad = segment_aad(&self.prefix, self.index, kind);
        let nonce = self.cipher.nonce_for(self.index);
        self.plain = self
            .cipher
            .open(&nonce, &aad, &sealed)
            .map_err(|_| SegmentError::Auth)?;
        self.pos = 0;
        self.index = self
            .index
            .checked_add(1)
            .ok_or(SegmentError::CounterExhausted)?;

        if kind == RECORD_FINAL {
            self.done = true;
            self.expect_eof()?;
        }
        Ok(())
    }

    fn expect_eof(&mut self) -> io::Result<()> {
        let mut peek = [0u8; 1];
        loop {
            match self.inner.read(&mut peek) {
                Ok(0) => return Ok(()),
                Ok(_) => return Err(SegmentError::TrailingData.into()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

fn read_record_part<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => SegmentError::Truncated.into(),
        _ => e,
    })
}

impl<R: Read> Read for SegmentReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        while self.pos == self.plain.len() {
            if self.done {
                return Ok(0);
            }
            self.next_record()?;
        }
        let n = out.len().min(self.plain.len() - self.pos);
        out[..n].copy_from_slice(&self.plain[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
