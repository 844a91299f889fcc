//! File content assembled from one or more ranged responses.
//!
//! A download is a sequence of network chunks, possibly spread over several
//! responses. [`FileContent`] and [`AsyncFileContent`] hide those boundaries
//! behind `read(n)`: bytes pulled from the network but not yet returned are
//! kept as leftover for the next call.

use bytes::{Bytes, BytesMut};
use cloudsdk_domain::constants::DEFAULT_PART_SIZE;
use cloudsdk_domain::{CloudError, ContentRange, Result};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use reqwest::header::HeaderValue;
use reqwest::StatusCode;

/// Windows still to request for a download.
#[derive(Debug, Clone, Default)]
pub(crate) struct RangePlan {
    chained: bool,
    last: Option<ContentRange>,
    consumed: u64,
}

impl RangePlan {
    /// One window, exactly as requested.
    pub(crate) fn single() -> Self {
        Self::default()
    }

    /// Follow `Content-Range` until the whole resource was fetched.
    pub(crate) fn chained() -> Self {
        Self { chained: true, ..Self::default() }
    }

    /// Account for a response that was just opened.
    ///
    /// A `200` without `Content-Range` holds the whole remaining content. A
    /// partial response must describe its range; a missing or malformed
    /// header there is a hard error.
    pub(crate) fn record(&mut self, status: StatusCode, header: Option<&HeaderValue>) -> Result<()> {
        if !self.chained {
            return Ok(());
        }
        let Some(header) = header else {
            if status == StatusCode::PARTIAL_CONTENT {
                return Err(CloudError::InvalidContentRange(String::new()));
            }
            self.last = None;
            return Ok(());
        };
        let text = header.to_str().map_err(|_| {
            CloudError::InvalidContentRange(String::from_utf8_lossy(header.as_bytes()).into_owned())
        })?;
        let range: ContentRange = text.parse()?;
        self.consumed = self.consumed.saturating_add(range.len());
        self.last = Some(range);
        Ok(())
    }

    /// Next inclusive window to request, if any, clamped to the total size.
    pub(crate) fn next_window(&self) -> Option<(u64, u64)> {
        let last = self.last?;
        if self.consumed >= last.total || last.end + 1 >= last.total {
            return None;
        }
        let start = last.end + 1;
        let end = last.end.saturating_add(DEFAULT_PART_SIZE).min(last.total - 1);
        Some((start, end))
    }
}

/// Leftover bookkeeping shared by both content readers.
#[derive(Debug, Default)]
struct Leftover {
    bytes: BytesMut,
}

impl Leftover {
    fn satisfies(&self, n: usize) -> bool {
        self.bytes.len() >= n
    }

    fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    fn take(&mut self, n: usize) -> Bytes {
        let n = n.min(self.bytes.len());
        self.bytes.split_to(n).freeze()
    }

    fn take_all(&mut self) -> Bytes {
        self.bytes.split().freeze()
    }

    fn clear(&mut self) {
        self.bytes.clear();
    }
}

/// Blocking file content.
///
/// Dropping the value, or calling [`FileContent::close`], releases the open
/// response.
pub struct FileContent<I = super::blocking::RangeChunks> {
    chunks: Option<I>,
    leftover: Leftover,
}

impl<I> FileContent<I>
where
    I: Iterator<Item = Result<Bytes>>,
{
    /// Content served from `chunks`, in order.
    pub fn new(chunks: I) -> Self {
        Self { chunks: Some(chunks), leftover: Leftover::default() }
    }

    /// Read at most `n` bytes; `0` reads the remaining content entirely.
    ///
    /// An empty result means the content is exhausted.
    pub fn read(&mut self, n: usize) -> Result<Bytes> {
        if n == 0 {
            return self.read_all();
        }
        while !self.leftover.satisfies(n) {
            match self.next_chunk()? {
                Some(chunk) => self.leftover.push(&chunk),
                None => break,
            }
        }
        Ok(self.leftover.take(n))
    }

    /// Read everything that is left.
    pub fn read_all(&mut self) -> Result<Bytes> {
        while let Some(chunk) = self.next_chunk()? {
            self.leftover.push(&chunk);
        }
        Ok(self.leftover.take_all())
    }

    /// Release the open response. Safe to call more than once.
    pub fn close(&mut self) {
        self.chunks = None;
        self.leftover.clear();
    }

    /// `true` after [`FileContent::close`] or once the content is exhausted.
    pub fn is_closed(&self) -> bool {
        self.chunks.is_none()
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let Some(chunks) = self.chunks.as_mut() else {
            return Ok(None);
        };
        match chunks.next().transpose()? {
            Some(chunk) => Ok(Some(chunk)),
            None => {
                // Exhausted: let go of the last response right away.
                self.chunks = None;
                Ok(None)
            }
        }
    }
}

/// Cooperative file content; same contract as [`FileContent`].
pub struct AsyncFileContent<S = BoxStream<'static, Result<Bytes>>> {
    chunks: Option<S>,
    leftover: Leftover,
}

impl<S> AsyncFileContent<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    /// Content served from the `chunks` stream, in order.
    pub fn new(chunks: S) -> Self {
        Self { chunks: Some(chunks), leftover: Leftover::default() }
    }

    /// Same contract as [`FileContent::read`].
    pub async fn read(&mut self, n: usize) -> Result<Bytes> {
        if n == 0 {
            return self.read_all().await;
        }
        while !self.leftover.satisfies(n) {
            match self.next_chunk().await? {
                Some(chunk) => self.leftover.push(&chunk),
                None => break,
            }
        }
        Ok(self.leftover.take(n))
    }

    pub async fn read_all(&mut self) -> Result<Bytes> {
        while let Some(chunk) = self.next_chunk().await? {
            self.leftover.push(&chunk);
        }
        Ok(self.leftover.take_all())
    }

    /// Release the open response stream. Safe to call more than once.
    ///
    /// Dropping the stream closes the connection without further I/O, so
    /// this does not need to be awaited.
    pub fn close(&mut self) {
        self.chunks = None;
        self.leftover.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.chunks.is_none()
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let Some(chunks) = self.chunks.as_mut() else {
            return Ok(None);
        };
        match chunks.next().await.transpose()? {
            Some(chunk) => Ok(Some(chunk)),
            None => {
                self.chunks = None;
                Ok(None)
            }
        }
    }
}

impl<I> std::fmt::Debug for FileContent<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileContent")
            .field("closed", &self.chunks.is_none())
            .field("leftover", &self.leftover.bytes.len())
            .finish()
    }
}

impl<S> std::fmt::Debug for AsyncFileContent<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFileContent")
            .field("closed", &self.chunks.is_none())
            .field("leftover", &self.leftover.bytes.len())
            .finish()
    }
}
