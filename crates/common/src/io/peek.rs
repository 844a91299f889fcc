//! Cursor bookkeeping shared by the blocking and cooperative buffered readers.
//!
//! The store is a fixed slice with a read cursor `r` and a write cursor `w`,
//! `0 <= r <= w <= capacity`. Bytes in `[r, w)` are buffered but unread.
//! Readers drive it through the same sequence (`clamp`, `make_room`,
//! `spare`/`commit` in a pull loop, `window`, `drain_into`) and differ only in
//! how they wait on their source.

#[derive(Debug)]
pub(crate) struct PeekBuffer {
    store: Box<[u8]>,
    r: usize,
    w: usize,
    pull_size: usize,
}

impl PeekBuffer {
    pub(crate) fn new(capacity: usize, pull_size: usize) -> Self {
        let capacity = capacity.max(1);
        Self { store: vec![0; capacity].into_boxed_slice(), r: 0, w: 0, pull_size: pull_size.max(1) }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.store.len()
    }

    pub(crate) fn buffered(&self) -> usize {
        self.w - self.r
    }

    /// Peeks never look further than the store can hold.
    pub(crate) fn clamp(&self, n: usize) -> usize {
        n.min(self.capacity())
    }

    /// Prepare the store to hold `n` unread bytes starting at `r`.
    ///
    /// Resets the cursors when nothing is unread and slides `[r, w)` to the
    /// front only when the window would run past the end of the store.
    pub(crate) fn make_room(&mut self, n: usize) {
        if self.r == self.w {
            self.r = 0;
            self.w = 0;
        } else if self.r + n > self.capacity() {
            self.store.copy_within(self.r..self.w, 0);
            self.w -= self.r;
            self.r = 0;
        }
    }

    /// Writable tail for the next source pull, at most one pull long.
    pub(crate) fn spare(&mut self) -> &mut [u8] {
        let end = self.capacity().min(self.w + self.pull_size);
        &mut self.store[self.w..end]
    }

    pub(crate) fn commit(&mut self, n: usize) {
        debug_assert!(self.w + n <= self.capacity());
        self.w += n;
    }

    /// Up to `n` unread bytes, without consuming them.
    pub(crate) fn window(&self, n: usize) -> &[u8] {
        let end = self.r + n.min(self.buffered());
        &self.store[self.r..end]
    }

    /// Move unread bytes into `out`, returning how many were copied.
    pub(crate) fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let n = out.len().min(self.buffered());
        out[..n].copy_from_slice(&self.store[self.r..self.r + n]);
        self.consume(n);
        n
    }

    pub(crate) fn consume(&mut self, n: usize) {
        self.r += n.min(self.buffered());
        if self.r == self.w {
            self.r = 0;
            self.w = 0;
        }
    }
}
