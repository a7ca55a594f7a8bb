//! Byte cursor for parsers and byte sinks for writers.
//!
//! Parsers never allocate from a length field they have not yet verified
//! against the remaining input, and hand string payloads to the event engine
//! in slices of at most [`CHUNK_SIZE`] bytes.

use crate::error::{Error, Result};

/// Upper bound of a single string or blob fragment passed through the engine.
pub const CHUNK_SIZE: usize = 4096;

/// Forward-only cursor over an input buffer with offset tracking.
///
/// # Examples
///
/// ```rust
/// use valuestream::io::Input;
///
/// let mut input = Input::new(b"\x01\x02\x03", "demo");
/// assert_eq!(input.get(), Some(1));
/// assert_eq!(input.read_array::<2>("two bytes").unwrap(), [2, 3]);
/// assert!(input.is_eof());
/// assert!(input.next_byte("more").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Input<'a> {
    data: &'a [u8],
    pos: usize,
    format: &'static str,
}

impl<'a> Input<'a> {
    /// `format` names the wire format in error messages.
    #[must_use]
    pub fn new(data: &'a [u8], format: &'static str) -> Self {
        Input {
            data,
            pos: 0,
            format,
        }
    }

    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }

    #[inline]
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    #[inline]
    pub fn get(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Steps back over the byte returned by the last `get`.
    #[inline]
    pub fn unget(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    /// Like `get`, but running out of input is an error naming `expected`.
    #[inline]
    pub fn next_byte(&mut self, expected: &str) -> Result<u8> {
        self.get().ok_or_else(|| self.eof_error(expected))
    }

    /// Consumes exactly `n` bytes.
    pub fn read_exact(&mut self, n: usize, expected: &str) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(self.eof_error(expected));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self, expected: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N, expected)?);
        Ok(out)
    }

    /// Consumes up to `max` bytes, never more than [`CHUNK_SIZE`]. An empty
    /// slice means the input is exhausted.
    pub fn read_chunk(&mut self, max: usize) -> &'a [u8] {
        let n = max.min(CHUNK_SIZE).min(self.remaining());
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        slice
    }

    /// The unread tail, without consuming it.
    #[must_use]
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.data.len());
    }

    /// Syntax error at the current offset.
    pub fn error<T: std::fmt::Display>(&self, msg: T) -> Error {
        Error::syntax(self.format, self.pos, msg)
    }

    /// Syntax error at an earlier offset, such as the start of a token.
    pub fn error_at<T: std::fmt::Display>(&self, offset: usize, msg: T) -> Error {
        Error::syntax(self.format, offset, msg)
    }

    pub fn eof_error(&self, expected: &str) -> Error {
        Error::unexpected_eof(self.format, self.pos, expected)
    }

    /// Fails unless every byte has been consumed.
    pub fn expect_end(&self) -> Result<()> {
        if self.is_eof() {
            Ok(())
        } else {
            Err(self.error("trailing bytes after value"))
        }
    }
}

/// Destination for encoded bytes.
pub trait Sink {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    #[inline]
    fn put(&mut self, byte: u8) -> Result<()> {
        self.write_all(&[byte])
    }

    /// Total bytes accepted so far.
    fn written(&self) -> usize;
}

impl Sink for Vec<u8> {
    #[inline]
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }

    #[inline]
    fn put(&mut self, byte: u8) -> Result<()> {
        self.push(byte);
        Ok(())
    }

    fn written(&self) -> usize {
        self.len()
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    #[inline]
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    #[inline]
    fn put(&mut self, byte: u8) -> Result<()> {
        (**self).put(byte)
    }

    fn written(&self) -> usize {
        (**self).written()
    }
}

/// Sink that only counts bytes, used for measuring encoded sizes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Counter {
    count: usize,
}

impl Counter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

impl Sink for Counter {
    #[inline]
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.count += bytes.len();
        Ok(())
    }

    fn written(&self) -> usize {
        self.count
    }
}

/// Adapter from [`std::io::Write`].
///
/// ```rust
/// use valuestream::io::{IoSink, Sink};
///
/// let mut sink = IoSink::new(Vec::new());
/// sink.write_all(b"abc").unwrap();
/// assert_eq!(sink.written(), 3);
/// assert_eq!(sink.into_inner(), b"abc");
/// ```
#[derive(Debug)]
pub struct IoSink<W> {
    inner: W,
    written: usize,
}

impl<W: std::io::Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        IoSink { inner, written: 0 }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(Error::from)
    }
}

impl<W: std::io::Write> Sink for IoSink<W> {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len();
        Ok(())
    }

    fn written(&self) -> usize {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_truncated_read_reports_offset() {
        let mut input = Input::new(&[1, 2, 3], "test");
        input.get();
        let err = input.read_exact(5, "payload").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.offset(), Some(1));
        // a failed read consumes nothing
        assert_eq!(input.offset(), 1);
    }

    #[test]
    fn test_read_chunk_is_bounded() {
        let data = vec![0u8; CHUNK_SIZE * 2 + 5];
        let mut input = Input::new(&data, "test");
        assert_eq!(input.read_chunk(usize::MAX).len(), CHUNK_SIZE);
        assert_eq!(input.read_chunk(10).len(), 10);
        assert_eq!(input.read_chunk(usize::MAX).len(), CHUNK_SIZE - 5);
        assert!(input.read_chunk(usize::MAX).is_empty());
    }

    #[test]
    fn test_unget_and_expect_end() {
        let mut input = Input::new(b"ab", "test");
        assert_eq!(input.get(), Some(b'a'));
        input.unget();
        assert_eq!(input.peek(), Some(b'a'));
        assert!(input.expect_end().is_err());
        input.skip(10);
        assert!(input.expect_end().is_ok());
    }

    #[test]
    fn test_counter_and_reborrow() {
        let mut counter = Counter::new();
        {
            let sink: &mut Counter = &mut counter;
            sink.write_all(b"1234").unwrap();
            sink.put(0).unwrap();
        }
        assert_eq!(counter.count(), 5);
    }
}
