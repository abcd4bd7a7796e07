//! Hand-off between the cpal data callback and the drain worker.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use media_capture_core::RingBuffer;

/// Byte ring buffer the audio callback writes into and `read` drains,
/// plus the first stream fault reported by the backend.
pub(crate) struct SharedBuffer {
    ring: Mutex<RingBuffer<u8>>,
    ready: Condvar,
    fault: Mutex<Option<String>>,
}

impl SharedBuffer {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(RingBuffer::new(capacity)),
            ready: Condvar::new(),
            fault: Mutex::new(None),
        }
    }

    /// Called from the audio callback. Never blocks on the reader.
    pub(crate) fn push(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.ring.lock().write(bytes);
        self.ready.notify_one();
    }

    /// Move up to `out.len()` bytes into `out`, waiting at most `timeout`
    /// for data to arrive. Returns 0 on timeout.
    pub(crate) fn read(&self, out: &mut [u8], timeout: Duration) -> usize {
        let mut ring = self.ring.lock();
        if ring.is_empty() {
            self.ready.wait_for(&mut ring, timeout);
        }
        ring.read_into(out)
    }

    /// Bytes lost to overflow so far.
    pub(crate) fn dropped(&self) -> u64 {
        self.ring.lock().dropped()
    }

    /// Record a stream fault; the first one wins. Wakes a waiting reader.
    pub(crate) fn fail(&self, message: String) {
        {
            let mut fault = self.fault.lock();
            if fault.is_none() {
                *fault = Some(message);
            }
        }
        self.ready.notify_all();
    }

    pub(crate) fn fault(&self) -> Option<String> {
        self.fault.lock().clone()
    }

    pub(crate) fn reset(&self) {
        self.ring.lock().reset();
        *self.fault.lock() = None;
    }
}
