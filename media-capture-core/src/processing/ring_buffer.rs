/// Fixed-capacity circular buffer between a capture callback and the drain worker.
///
/// Not synchronized on its own: wrap in `Arc<parking_lot::Mutex<RingBuffer<T>>>`
/// (plus a `Condvar` when the reader should block) for cross-thread access.
///
/// Overflow behavior: drops the oldest elements and counts them.
#[derive(Debug)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
    dropped: u64,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a buffer holding up to `capacity` elements (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![T::default(); capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
            dropped: 0,
        }
    }

    /// Write elements into the ring buffer.
    ///
    /// If the buffer overflows, the oldest elements are dropped.
    /// If `items` is larger than capacity, only the last `capacity` items are kept.
    pub fn write(&mut self, items: &[T]) {
        if items.is_empty() {
            return;
        }

        let items = if items.len() > self.capacity {
            let skipped = items.len() - self.capacity;
            self.dropped += skipped as u64;
            &items[skipped..]
        } else {
            items
        };

        let overflow = (self.available + items.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
            self.dropped += overflow as u64;
        }

        for &item in items {
            self.buffer[self.write_index] = item;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available += items.len();
    }

    /// Move up to `out.len()` elements into `out`, oldest first.
    ///
    /// Returns the number of elements copied.
    pub fn read_into(&mut self, out: &mut [T]) -> usize {
        let to_read = out.len().min(self.available);
        for (i, slot) in out.iter_mut().take(to_read).enumerate() {
            *slot = self.buffer[(self.read_index + i) % self.capacity];
        }
        self.read_index = (self.read_index + to_read) % self.capacity;
        self.available -= to_read;
        to_read
    }

    /// Read and remove up to `count` elements from the buffer.
    pub fn read(&mut self, count: usize) -> Vec<T> {
        let mut result = vec![T::default(); count.min(self.available)];
        self.read_into(&mut result);
        result
    }

    /// Number of elements currently available for reading.
    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Elements discarded by overflow since creation or the last reset.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Reset the buffer to empty state.
    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
        self.dropped = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
