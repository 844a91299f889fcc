//! Buffered readers with bounded look-ahead.
//!
//! [`BufferedReader`] wraps a blocking [`Read`] source and
//! [`AsyncBufferedReader`] wraps a tokio [`AsyncRead`] source. Both expose
//! the same contract:
//!
//! - `peek(n)` returns up to `min(n, capacity)` bytes without consuming
//!   them, pulling from the source in fixed-size chunks until that many are
//!   buffered or the source reports end of stream. Two peeks without an
//!   intervening read return the same bytes.
//! - reading serves buffered bytes first and then performs at most one
//!   direct pull from the source for the remainder. Only `peek` runs the
//!   refill loop.

use std::io::{self, Read};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use super::peek::PeekBuffer;
use super::DEFAULT_PULL_SIZE;

/// Blocking reader with bounded look-ahead.
#[derive(Debug)]
pub struct BufferedReader<R> {
    inner: R,
    buffer: PeekBuffer,
    eof: bool,
    pending: Option<io::Error>,
}

impl<R> BufferedReader<R> {
    /// Reader holding at most `capacity` bytes of look-ahead, pulling
    /// [`DEFAULT_PULL_SIZE`] bytes at a time.
    pub fn new(inner: R, capacity: usize) -> Self {
        Self::with_pull_size(inner, capacity, DEFAULT_PULL_SIZE)
    }

    /// Like [`BufferedReader::new`] with a custom size for each source pull.
    pub fn with_pull_size(inner: R, capacity: usize, pull_size: usize) -> Self {
        Self { inner, buffer: PeekBuffer::new(capacity, pull_size), eof: false, pending: None }
    }

    /// Largest look-ahead a peek can return.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Bytes held in memory and not yet read.
    pub fn buffered(&self) -> usize {
        self.buffer.buffered()
    }

    /// Unwrap the source. Buffered bytes are discarded.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> BufferedReader<R> {
    /// Look at up to `n` upcoming bytes without consuming them.
    ///
    /// An empty slice means the source is exhausted. Requests larger than
    /// the capacity are clamped to it.
    pub fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        let n = self.buffer.clamp(n);
        if self.buffer.buffered() < n {
            if let Some(err) = self.pending.take() {
                return Err(err);
            }
            self.buffer.make_room(n);
            while self.buffer.buffered() < n && !self.eof {
                match self.inner.read(self.buffer.spare()) {
                    Ok(0) => self.eof = true,
                    Ok(read) => self.buffer.commit(read),
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(self.buffer.window(n))
    }
}

impl<R: Read> Read for BufferedReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }

        let served = self.buffer.drain_into(out);
        if served == out.len() || self.eof {
            return Ok(served);
        }
        if let Some(err) = self.pending.take() {
            if served == 0 {
                return Err(err);
            }
            self.pending = Some(err);
            return Ok(served);
        }

        match self.inner.read(&mut out[served..]) {
            Ok(0) => {
                self.eof = true;
                Ok(served)
            }
            Ok(read) => Ok(served + read),
            Err(err) if err.kind() == io::ErrorKind::Interrupted && served > 0 => Ok(served),
            // Bytes already handed out win; the error is reported next.
            Err(err) if served > 0 => {
                self.pending = Some(err);
                Ok(served)
            }
            Err(err) => Err(err),
        }
    }
}

/// Cooperative reader with bounded look-ahead.
#[derive(Debug)]
pub struct AsyncBufferedReader<R> {
    inner: R,
    buffer: PeekBuffer,
    eof: bool,
    pending: Option<io::Error>,
}

impl<R> AsyncBufferedReader<R> {
    /// Same as [`BufferedReader::new`].
    pub fn new(inner: R, capacity: usize) -> Self {
        Self::with_pull_size(inner, capacity, DEFAULT_PULL_SIZE)
    }

    pub fn with_pull_size(inner: R, capacity: usize, pull_size: usize) -> Self {
        Self { inner, buffer: PeekBuffer::new(capacity, pull_size), eof: false, pending: None }
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.buffered()
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncBufferedReader<R> {
    /// Look at up to `n` upcoming bytes without consuming them.
    ///
    /// Same contract as [`BufferedReader::peek`].
    pub async fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        let n = self.buffer.clamp(n);
        if self.buffer.buffered() < n {
            if let Some(err) = self.pending.take() {
                return Err(err);
            }
            self.buffer.make_room(n);
            while self.buffer.buffered() < n && !self.eof {
                match self.inner.read(self.buffer.spare()).await {
                    Ok(0) => self.eof = true,
                    Ok(read) => self.buffer.commit(read),
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(self.buffer.window(n))
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for AsyncBufferedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if out.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        if this.buffer.buffered() == 0 {
            if let Some(err) = this.pending.take() {
                return Poll::Ready(Err(err));
            }
            if this.eof {
                return Poll::Ready(Ok(()));
            }
            let before = out.filled().len();
            ready!(Pin::new(&mut this.inner).poll_read(cx, out))?;
            if out.filled().len() == before {
                this.eof = true;
            }
            return Poll::Ready(Ok(()));
        }

        let served = this.buffer.drain_into(out.initialize_unfilled());
        out.advance(served);
        if out.remaining() == 0 || this.eof {
            return Poll::Ready(Ok(()));
        }

        // One direct pull for the remainder. A pending source must not hold
        // back the bytes already served; a failed one is reported next.
        let before = out.filled().len();
        match Pin::new(&mut this.inner).poll_read(cx, out) {
            Poll::Ready(Ok(())) if out.filled().len() == before => this.eof = true,
            Poll::Ready(Err(err)) if err.kind() != io::ErrorKind::Interrupted => {
                this.pending = Some(err);
            }
            Poll::Ready(_) | Poll::Pending => {}
        }
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::testing::{pattern, ChunkedSource, FailingSource};

    #[test]
    fn peek_is_idempotent() {
        let mut reader = BufferedReader::with_pull_size(Cursor::new(pattern(20)), 8, 3);

        let first = reader.peek(6).unwrap().to_vec();
        let second = reader.peek(6).unwrap().to_vec();

        assert_eq!(first, pattern(6));
        assert_eq!(first, second);
    }

    #[test]
    fn read_after_peek_returns_peeked_bytes() {
        let mut reader = BufferedReader::with_pull_size(Cursor::new(pattern(20)), 8, 3);
        let peeked = reader.peek(7).unwrap().to_vec();

        let mut out = vec![0u8; 7];
        let n = reader.read(&mut out).unwrap();

        assert_eq!(n, 7);
        assert_eq!(out, peeked);
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn peek_clamps_to_capacity() {
        let mut reader = BufferedReader::new(Cursor::new(pattern(100)), 10);
        assert_eq!(reader.peek(64).unwrap().len(), 10);
    }

    #[test]
    fn peek_refills_across_short_source_reads() {
        let source = ChunkedSource::new(pattern(12), 1);
        let mut reader = BufferedReader::new(source, 16);

        assert_eq!(reader.peek(10).unwrap(), &pattern(10)[..]);
        assert_eq!(reader.peek(16).unwrap(), &pattern(12)[..]);
    }

    #[test]
    fn peek_past_end_returns_what_is_left() {
        let mut reader = BufferedReader::new(Cursor::new(pattern(3)), 8);
        assert_eq!(reader.peek(8).unwrap().len(), 3);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, pattern(3));
        assert!(reader.peek(8).unwrap().is_empty());
    }

    #[test]
    fn read_serves_buffer_then_one_direct_pull() {
        let source = ChunkedSource::new(pattern(20), 4);
        let mut reader = BufferedReader::new(source, 4);
        reader.peek(2).unwrap();
        assert_eq!(reader.buffered(), 4);

        let mut out = vec![0u8; 12];
        let n = reader.read(&mut out).unwrap();

        // Four from the buffer plus a single four-byte pull.
        assert_eq!(n, 8);
        assert_eq!(&out[..n], &pattern(8)[..]);
    }

    #[test]
    fn interleaved_peeks_and_reads_preserve_order() {
        let mut reader = BufferedReader::with_pull_size(Cursor::new(pattern(50)), 6, 4);
        let mut collected = Vec::new();

        loop {
            let peeked = reader.peek(5).unwrap().to_vec();
            if peeked.is_empty() {
                break;
            }
            let mut out = vec![0u8; 3];
            let n = reader.read(&mut out).unwrap();
            assert_eq!(&out[..n], &peeked[..n]);
            collected.extend_from_slice(&out[..n]);
        }

        assert_eq!(collected, pattern(50));
    }

    #[test]
    fn source_error_after_served_bytes_is_reported_next() {
        let source = FailingSource::new(pattern(4), io::ErrorKind::BrokenPipe).fail_once();
        let mut reader = BufferedReader::new(source, 4);
        assert_eq!(reader.peek(4).unwrap(), &pattern(4)[..]);

        let mut out = [0u8; 8];
        assert_eq!(reader.read(&mut out).unwrap(), 4);
        assert_eq!(&out[..4], &pattern(4)[..]);
        assert_eq!(reader.read(&mut out).unwrap_err().kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(reader.read(&mut out).unwrap(), 0);
    }

    #[test]
    fn stored_source_error_surfaces_through_peek() {
        let source = FailingSource::new(pattern(4), io::ErrorKind::ConnectionReset).fail_once();
        let mut reader = BufferedReader::new(source, 4);
        reader.peek(4).unwrap();

        let mut out = [0u8; 8];
        assert_eq!(reader.read(&mut out).unwrap(), 4);
        assert_eq!(reader.peek(4).unwrap_err().kind(), io::ErrorKind::ConnectionReset);
        assert!(reader.peek(4).unwrap().is_empty());
    }

    #[tokio::test]
    async fn async_source_error_after_served_bytes_is_reported_next() {
        let source = tokio_test::io::Builder::new()
            .read(b"abcd")
            .read_error(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            .build();
        let mut reader = AsyncBufferedReader::new(source, 4);
        assert_eq!(reader.peek(4).await.unwrap(), b"abcd");

        let mut out = [0u8; 8];
        assert_eq!(reader.read(&mut out).await.unwrap(), 4);
        assert_eq!(&out[..4], b"abcd");
        assert_eq!(reader.read(&mut out).await.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(reader.read(&mut out).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn async_peek_matches_blocking_contract() {
        let data = pattern(20);
        let mut reader = AsyncBufferedReader::with_pull_size(&data[..], 8, 3);

        let first = reader.peek(6).await.unwrap().to_vec();
        let second = reader.peek(6).await.unwrap().to_vec();
        assert_eq!(first, pattern(6));
        assert_eq!(first, second);

        let mut out = vec![0u8; 6];
        reader.read_exact(&mut out).await.unwrap();
        assert_eq!(out, first);

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, &data[6..]);
    }

    #[tokio::test]
    async fn async_peek_clamps_and_reports_exhaustion() {
        let data = pattern(5);
        let mut reader = AsyncBufferedReader::new(&data[..], 4);

        assert_eq!(reader.peek(100).await.unwrap().len(), 4);
        let mut all = Vec::new();
        reader.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, data);
        assert!(reader.peek(4).await.unwrap().is_empty());
    }
}
