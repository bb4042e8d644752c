//! # Byte Sources - Reader Input
//!
//! ## Purpose
//!
//! [`ByteSource`] is the input boundary of the [`crate::StreamReader`]: a
//! `std::io::Read` that can also report exhaustion between envelopes and,
//! when backed by memory, hand out zero-copy slices.
//!
//! ```text
//! BytesSource   in-memory Bytes   slices: yes  → lazy sub-messages, zero-copy values
//! StreamSource  any io::Read      slices: no   → forward-only, everything decoded
//! ```

use std::io::{self, Read};

use bytes::Bytes;

/// Input for the stream reader
pub trait ByteSource: Read {
    /// True when no further byte can be read
    ///
    /// May block on a stream until a byte arrives or the stream ends.
    fn is_exhausted(&mut self) -> io::Result<bool>;

    /// Detach the next `len` bytes without copying
    ///
    /// `None` means the source cannot skip ahead; nothing has been consumed.
    fn take_slice(&mut self, len: usize) -> Option<io::Result<Bytes>> {
        let _ = len;
        None
    }

    /// Whether [`ByteSource::take_slice`] is supported
    fn supports_skip(&self) -> bool {
        false
    }
}

/// In-memory source over shared bytes
#[derive(Debug, Clone, Default)]
pub struct BytesSource {
    data: Bytes,
    position: usize,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

impl Read for BytesSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = buf.len().min(self.remaining());
        buf[..count].copy_from_slice(&self.data[self.position..self.position + count]);
        self.position += count;
        Ok(count)
    }
}

impl ByteSource for BytesSource {
    fn is_exhausted(&mut self) -> io::Result<bool> {
        Ok(self.remaining() == 0)
    }

    fn take_slice(&mut self, len: usize) -> Option<io::Result<Bytes>> {
        if len > self.remaining() {
            return Some(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("need {len} bytes, {} remain", self.remaining()),
            )));
        }
        let slice = self.data.slice(self.position..self.position + len);
        self.position += len;
        Some(Ok(slice))
    }

    fn supports_skip(&self) -> bool {
        true
    }
}

/// Forward-only source over any reader, such as a socket or pipe
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: R,
    peeked: Option<u8>,
}

impl<R: Read> StreamSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Underlying reader; a byte read ahead by `is_exhausted` is lost
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for StreamSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.peeked.take() {
            Some(byte) => {
                buf[0] = byte;
                Ok(1)
            }
            None => self.inner.read(buf),
        }
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn is_exhausted(&mut self) -> io::Result<bool> {
        if self.peeked.is_some() {
            return Ok(false);
        }
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(true),
                Ok(_) => {
                    self.peeked = Some(byte[0]);
                    return Ok(false);
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            }
        }
    }
}
