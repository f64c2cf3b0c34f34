//! Fixed-capacity sliding window over a single channel.
//!
//! Backed by a `HeapRb`; a push into a full window evicts the oldest
//! sample first, so the window always holds the most recent `capacity`
//! samples in arrival order.

use std::fmt;

use ringbuf::{traits::*, HeapRb};

pub struct WindowBuffer<T> {
    ring: HeapRb<T>,
    capacity: usize,
    evicted: u64,
}

impl<T> fmt::Debug for WindowBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowBuffer")
            .field("len", &self.ring.occupied_len())
            .field("capacity", &self.capacity)
            .field("evicted", &self.evicted)
            .finish()
    }
}

impl<T: Copy> WindowBuffer<T> {
    /// Create a window holding at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ring: HeapRb::new(capacity),
            capacity,
            evicted: 0,
        }
    }

    /// Append a sample, evicting the oldest when full
    #[inline]
    pub fn push(&mut self, value: T) {
        if self.ring.is_full() {
            let _ = self.ring.try_pop();
            self.evicted += 1;
        }
        let _ = self.ring.try_push(value);
    }

    /// Copy of the current contents, oldest first
    pub fn snapshot_all(&self) -> Vec<T> {
        self.ring.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ring.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples evicted by overflow since creation
    #[inline]
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}
