//! Readers that stop at a fixed byte limit.
//!
//! The wrapped source is never asked for more than the bytes left in the
//! window, so several windows can be cut in sequence from one shared source.
//! Once the limit is reached every read reports end of stream without
//! touching the source.

use std::io::{self, Read};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Byte accounting for one window, `0 <= consumed <= limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    limit: u64,
    consumed: u64,
}

impl Window {
    pub(crate) fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.limit - self.consumed
    }

    /// How many of `wanted` bytes may be requested from the source.
    pub(crate) fn allowance(&self, wanted: usize) -> usize {
        usize::try_from(self.remaining()).map_or(wanted, |remaining| remaining.min(wanted))
    }

    pub(crate) fn advance(&mut self, n: usize) {
        self.consumed = (self.consumed + n as u64).min(self.limit);
    }
}

/// Blocking reader yielding at most `limit` bytes of its source.
#[derive(Debug)]
pub struct LimitedReader<R> {
    inner: R,
    window: Window,
}

impl<R> LimitedReader<R> {
    /// Window of `limit` bytes over `inner`, starting at its current position.
    pub fn new(inner: R, limit: u64) -> Self {
        Self { inner, window: Window::new(limit) }
    }

    /// Size of the window.
    pub fn limit(&self) -> u64 {
        self.window.limit
    }

    /// Bytes handed out so far.
    pub fn consumed(&self) -> u64 {
        self.window.consumed
    }

    /// Bytes the window still allows.
    pub fn remaining(&self) -> u64 {
        self.window.remaining()
    }

    /// `true` once every read reports end of stream.
    pub fn is_exhausted(&self) -> bool {
        self.window.remaining() == 0
    }

    /// Give the source back, positioned after the bytes consumed.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for LimitedReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let allowed = self.window.allowance(out.len());
        if allowed == 0 {
            return Ok(0);
        }
        let n = self.inner.read(&mut out[..allowed])?;
        self.window.advance(n);
        Ok(n)
    }
}

/// Cooperative reader yielding at most `limit` bytes of its source.
#[derive(Debug)]
pub struct AsyncLimitedReader<R> {
    inner: R,
    window: Window,
}

impl<R> AsyncLimitedReader<R> {
    pub fn new(inner: R, limit: u64) -> Self {
        Self { inner, window: Window::new(limit) }
    }

    pub fn limit(&self) -> u64 {
        self.window.limit
    }

    pub fn consumed(&self) -> u64 {
        self.window.consumed
    }

    pub fn remaining(&self) -> u64 {
        self.window.remaining()
    }

    pub fn is_exhausted(&self) -> bool {
        self.window.remaining() == 0
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for AsyncLimitedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let allowed = this.window.allowance(out.remaining());
        if allowed == 0 {
            return Poll::Ready(Ok(()));
        }

        let mut limited = ReadBuf::new(out.initialize_unfilled_to(allowed));
        ready!(Pin::new(&mut this.inner).poll_read(cx, &mut limited))?;
        let n = limited.filled().len();

        out.advance(n);
        this.window.advance(n);
        Poll::Ready(Ok(()))
    }
}
