//! Receive buffer for one session
//!
//! A zero-initialised byte arena with a write cursor. Reads land at the
//! cursor; everything before it is the response received so far. Capacity
//! only ever grows, by a fixed step, when the arena is full.

use crate::constants::buffer;
use crate::protocol;

#[derive(Debug, Clone)]
pub struct ResponseBuffer {
    data: Vec<u8>,
    position: usize,
}

impl ResponseBuffer {
    /// Allocate a buffer of `capacity` zeroed bytes
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            position: 0,
        }
    }

    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Write cursor: number of response bytes held
    #[must_use]
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.position == self.data.len()
    }

    /// Forget the current response; capacity is kept
    #[inline]
    pub fn clear(&mut self) {
        self.position = 0;
    }

    /// Grow by one step if full, returning the old and new capacity
    pub fn grow_if_full(&mut self) -> Option<(usize, usize)> {
        if !self.is_full() {
            return None;
        }
        let old = self.data.len();
        self.data.resize(old + buffer::GROWTH, 0);
        Some((old, self.data.len()))
    }

    /// Free space after the cursor, where the next read goes
    #[inline]
    pub fn spare_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.position..]
    }

    /// Move the cursor past `n` freshly written bytes
    ///
    /// # Panics
    /// Panics if `n` exceeds the spare space
    #[inline]
    pub fn advance(&mut self, n: usize) {
        assert!(
            n <= self.data.len() - self.position,
            "advance past buffer capacity"
        );
        self.position += n;
    }

    /// Bytes received so far, `[0, cursor)`
    #[must_use]
    #[inline]
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.position]
    }

    /// The last five bytes before the cursor are the multi-line terminator
    #[must_use]
    #[inline]
    pub fn ends_with_terminator(&self) -> bool {
        protocol::has_terminator_at_end(self.filled())
    }

    /// At least one full line has been received
    #[must_use]
    pub fn has_line(&self) -> bool {
        protocol::has_complete_line(self.filled())
    }

    /// Leading three-digit reply code, once three bytes are present
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        protocol::parse_status_code(self.filled())
    }

    /// Received bytes decoded and trimmed
    #[must_use]
    pub fn text(&self) -> String {
        protocol::decode_text(self.filled())
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::with_capacity(buffer::INITIAL)
    }
}
