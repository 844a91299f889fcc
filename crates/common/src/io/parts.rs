//! Splitting a byte source into bounded parts.
//!
//! A splitter yields [`Part`]s one at a time. Each part mutably borrows the
//! splitter's buffered source for as long as it lives, so the borrow checker
//! keeps the splitter from advancing while a part is still in use. A part
//! dropped before its declared length was read makes the next call to
//! `next_part` fail rather than silently shift every later part.
//!
//! When the total size is known the buffer holds a single byte (enough to
//! detect a source that ends early) and part lengths follow from the total:
//! `part_size` for every part but the last, which carries the remainder. An
//! exact multiple of `part_size` yields only full parts. When the total is
//! unknown the buffer holds one whole part and each part is exactly what a
//! `peek(part_size)` finds, so only the last part can be shorter.

use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

use super::buffered::{AsyncBufferedReader, BufferedReader};
use super::limited::{AsyncLimitedReader, LimitedReader};

/// Position of a splitter within its source; shared by both splitters.
#[derive(Debug)]
struct SplitPlan {
    part_size: usize,
    total: Option<u64>,
    offset: u64,
    number: u32,
    /// Unread bytes of the last issued part, recorded when it is dropped.
    outstanding: u64,
}

impl SplitPlan {
    fn new(part_size: usize, total: Option<u64>) -> Self {
        Self { part_size: part_size.max(1), total, offset: 0, number: 0, outstanding: 0 }
    }

    fn buffer_capacity(&self) -> usize {
        match self.total {
            Some(_) => 1,
            None => self.part_size,
        }
    }

    /// How far to peek before the next part, or `None` when the total is met.
    fn probe(&self) -> io::Result<Option<usize>> {
        if self.outstanding > 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "part {} was released with {} unread bytes",
                    self.number, self.outstanding
                ),
            ));
        }
        Ok(match self.total {
            Some(total) if self.offset >= total => None,
            Some(_) => Some(1),
            None => Some(self.part_size),
        })
    }

    /// Length of the next part given how many bytes the probe found.
    fn next_len(&self, available: usize) -> Option<u64> {
        if available == 0 {
            return None;
        }
        Some(match self.total {
            Some(total) => (self.part_size as u64).min(total - self.offset),
            None => available as u64,
        })
    }

    fn begin(&mut self, len: u64) -> u32 {
        self.offset += len;
        self.number += 1;
        self.outstanding = len;
        self.number
    }
}

/// Splits a blocking source into sequential parts.
#[derive(Debug)]
pub struct PartSplitter<R> {
    reader: BufferedReader<R>,
    plan: SplitPlan,
}

impl<R: Read> PartSplitter<R> {
    /// `total` is the exact source size when known.
    pub fn new(source: R, part_size: usize, total: Option<u64>) -> Self {
        let plan = SplitPlan::new(part_size, total);
        Self { reader: BufferedReader::new(source, plan.buffer_capacity()), plan }
    }

    /// Bytes handed out in parts so far.
    pub fn offset(&self) -> u64 {
        self.plan.offset
    }

    /// The next part, or `None` once the source or the declared total is
    /// exhausted.
    pub fn next_part(&mut self) -> io::Result<Option<Part<'_, R>>> {
        let Some(probe) = self.plan.probe()? else {
            return Ok(None);
        };
        let available = self.reader.peek(probe)?.len();
        let Some(len) = self.plan.next_len(available) else {
            return Ok(None);
        };

        let number = self.plan.begin(len);
        Ok(Some(Part {
            number,
            reader: LimitedReader::new(&mut self.reader, len),
            outstanding: &mut self.plan.outstanding,
        }))
    }
}

/// A bounded slice of a [`PartSplitter`]'s source.
#[derive(Debug)]
pub struct Part<'a, R> {
    number: u32,
    reader: LimitedReader<&'a mut BufferedReader<R>>,
    outstanding: &'a mut u64,
}

impl<R> Part<'_, R> {
    /// One-based position of the part in its source.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Declared length; the part yields exactly this many bytes unless the
    /// source ends early.
    pub fn len(&self) -> u64 {
        self.reader.limit()
    }

    pub fn is_empty(&self) -> bool {
        self.reader.limit() == 0
    }

    /// Bytes of the declared length not read yet.
    pub fn remaining(&self) -> u64 {
        self.reader.remaining()
    }
}

impl<R: Read> Read for Part<'_, R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.reader.read(out)
    }
}

impl<R> Drop for Part<'_, R> {
    fn drop(&mut self) {
        *self.outstanding = self.reader.remaining();
    }
}

/// Splits a cooperative source into sequential parts.
#[derive(Debug)]
pub struct AsyncPartSplitter<R> {
    reader: AsyncBufferedReader<R>,
    plan: SplitPlan,
}

impl<R: AsyncRead + Unpin> AsyncPartSplitter<R> {
    /// Same as [`PartSplitter::new`].
    pub fn new(source: R, part_size: usize, total: Option<u64>) -> Self {
        let plan = SplitPlan::new(part_size, total);
        Self { reader: AsyncBufferedReader::new(source, plan.buffer_capacity()), plan }
    }

    pub fn offset(&self) -> u64 {
        self.plan.offset
    }

    /// Same contract as [`PartSplitter::next_part`].
    pub async fn next_part(&mut self) -> io::Result<Option<AsyncPart<'_, R>>> {
        let Some(probe) = self.plan.probe()? else {
            return Ok(None);
        };
        let available = self.reader.peek(probe).await?.len();
        let Some(len) = self.plan.next_len(available) else {
            return Ok(None);
        };

        let number = self.plan.begin(len);
        Ok(Some(AsyncPart {
            number,
            reader: AsyncLimitedReader::new(&mut self.reader, len),
            outstanding: &mut self.plan.outstanding,
        }))
    }
}

/// A bounded slice of an [`AsyncPartSplitter`]'s source.
#[derive(Debug)]
pub struct AsyncPart<'a, R> {
    number: u32,
    reader: AsyncLimitedReader<&'a mut AsyncBufferedReader<R>>,
    outstanding: &'a mut u64,
}

impl<R> AsyncPart<'_, R> {
    /// One-based position of the part in its source.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Declared length, as for [`Part::len`].
    pub fn len(&self) -> u64 {
        self.reader.limit()
    }

    pub fn is_empty(&self) -> bool {
        self.reader.limit() == 0
    }

    pub fn remaining(&self) -> u64 {
        self.reader.remaining()
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for AsyncPart<'_, R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().reader).poll_read(cx, out)
    }
}

impl<R> Drop for AsyncPart<'_, R> {
    fn drop(&mut self) {
        *self.outstanding = self.reader.remaining();
    }
}
