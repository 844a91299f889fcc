//! Fabricated byte sources for transfer tests.

#![allow(clippy::missing_errors_doc)]

use std::io::{self, Read};

use rand::{Rng, SeedableRng};

/// `len` bytes counting up from zero and wrapping at 251, so misplaced
/// offsets show up in comparisons.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// `len` pseudo-random bytes; the same seed yields the same payload.
///
/// ```ignore
/// use cloudsdk_common::testing::random_bytes_seeded;
///
/// assert_eq!(random_bytes_seeded(16, 7), random_bytes_seeded(16, 7));
/// ```
pub fn random_bytes_seeded(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// Source returning at most `chunk` bytes per read, like a socket or pipe.
#[derive(Debug, Clone)]
pub struct ChunkedSource {
    data: Vec<u8>,
    position: usize,
    chunk: usize,
    reads: usize,
}

impl ChunkedSource {
    pub fn new(data: Vec<u8>, chunk: usize) -> Self {
        Self { data, position: 0, chunk: chunk.max(1), reads: 0 }
    }

    /// Number of `read` calls served so far, including the final empty one.
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

impl Read for ChunkedSource {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.reads += 1;
        let n = out.len().min(self.chunk).min(self.data.len() - self.position);
        out[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}

/// Source yielding `data` and then failing every read.
#[derive(Debug, Clone)]
pub struct FailingSource {
    data: Vec<u8>,
    position: usize,
    kind: io::ErrorKind,
    once: bool,
    failed: bool,
}

impl FailingSource {
    pub fn new(data: Vec<u8>, kind: io::ErrorKind) -> Self {
        Self { data, position: 0, kind, once: false, failed: false }
    }

    /// Fail a single read after `data`, then report end of stream.
    #[must_use]
    pub fn fail_once(mut self) -> Self {
        self.once = true;
        self
    }
}

impl Read for FailingSource {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.position == self.data.len() {
            if self.once && self.failed {
                return Ok(0);
            }
            self.failed = true;
            return Err(io::Error::new(self.kind, "fabricated source failure"));
        }
        let n = out.len().min(self.data.len() - self.position);
        out[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunked_source_caps_each_read() {
        let mut source = ChunkedSource::new(pattern(5), 2);
        let mut out = [0u8; 8];

        assert_eq!(source.read(&mut out).unwrap(), 2);
        assert_eq!(source.read(&mut out).unwrap(), 2);
        assert_eq!(source.read(&mut out).unwrap(), 1);
        assert_eq!(source.read(&mut out).unwrap(), 0);
        assert_eq!(source.reads(), 4);
    }

    #[test]
    fn failing_source_errors_after_data() {
        let mut source = FailingSource::new(vec![1, 2], io::ErrorKind::BrokenPipe);
        let mut out = [0u8; 4];

        assert_eq!(source.read(&mut out).unwrap(), 2);
        assert_eq!(source.read(&mut out).unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn failing_source_can_fail_once() {
        let mut source = FailingSource::new(vec![1], io::ErrorKind::BrokenPipe).fail_once();
        let mut out = [0u8; 4];

        assert_eq!(source.read(&mut out).unwrap(), 1);
        assert!(source.read(&mut out).is_err());
        assert_eq!(source.read(&mut out).unwrap(), 0);
    }
}
