//! Bounded ring buffer with an eviction callback.
//!
//! Fixed capacity, O(1) push. At capacity the oldest element is handed to
//! the optional eviction callback exactly once, then its slot is
//! overwritten. Not internally synchronized; the orchestrator wraps it in
//! its own lock.

/// Fixed-capacity FIFO buffer that overwrites its oldest element when full.
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    head: usize,
    len: usize,
    on_evict: Option<Box<dyn FnMut(T) + Send>>,
}

impl<T> RingBuffer<T> {
    /// Create a buffer holding up to `capacity` elements.
    ///
    /// # Panics
    /// Panics if `capacity` is zero; callers validate capacity in their
    /// config before construction.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be greater than 0");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            head: 0,
            len: 0,
            on_evict: None,
        }
    }

    /// Create a buffer whose evicted elements are handed to `on_evict`.
    pub fn with_eviction_callback(
        capacity: usize,
        on_evict: impl FnMut(T) + Send + 'static,
    ) -> Self {
        let mut buffer = Self::new(capacity);
        buffer.on_evict = Some(Box::new(on_evict));
        buffer
    }

    /// Append an element, evicting the oldest if the buffer is full.
    ///
    /// The eviction callback runs before the new element takes the slot.
    pub fn push(&mut self, value: T) {
        let tail = (self.head + self.len) % self.slots.len();
        if self.len == self.slots.len() {
            // Full: tail == head; the head element is evicted.
            if let Some(evicted) = self.slots[self.head].take() {
                if let Some(callback) = &mut self.on_evict {
                    callback(evicted);
                }
            }
            self.slots[self.head] = Some(value);
            self.head = (self.head + 1) % self.slots.len();
        } else {
            self.slots[tail] = Some(value);
            self.len += 1;
        }
    }

    /// Element at logical index `i`, where 0 is the oldest.
    pub fn get(&self, i: usize) -> Option<&T> {
        if i >= self.len {
            return None;
        }
        self.slots[(self.head + i) % self.slots.len()].as_ref()
    }

    /// The oldest element.
    pub fn oldest(&self) -> Option<&T> {
        self.get(0)
    }

    /// The most recently pushed element.
    pub fn latest(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Up to `n` most recent elements, newest first.
    pub fn last_n(&self, n: usize) -> Vec<&T> {
        (0..self.len.min(n))
            .filter_map(|i| self.get(self.len - 1 - i))
            .collect()
    }

    /// All elements, oldest first.
    pub fn to_vec(&self) -> Vec<&T> {
        (0..self.len).filter_map(|i| self.get(i)).collect()
    }

    /// Number of stored elements; never exceeds capacity.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the next push will evict.
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Maximum number of elements.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Remove all elements without firing the eviction callback.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .finish()
    }
}
