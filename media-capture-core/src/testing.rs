//! Deterministic test doubles for sources and sinks.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevice, AudioFormat};
use crate::models::error::CaptureError;
use crate::traits::byte_sink::ByteSink;
use crate::traits::sample_source::SampleSource;

enum Step {
    Block(Vec<u8>),
    Fault(String),
}

/// Calls observed by a [`ScriptedSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLog {
    pub opened: usize,
    pub started: usize,
    pub reads: usize,
    pub stopped: usize,
    pub released: usize,
}

/// Source replaying a scripted sequence of blocks and faults.
///
/// Clones share the same script and log, so a test can keep a handle after
/// moving the source into a session.
#[derive(Clone)]
pub struct ScriptedSource {
    steps: Arc<Mutex<VecDeque<Step>>>,
    log: Arc<Mutex<SourceLog>>,
    repeat: Option<Vec<u8>>,
    open_error: Option<CaptureError>,
    start_error: Option<CaptureError>,
}

impl ScriptedSource {
    pub fn new(blocks: Vec<Vec<u8>>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(blocks.into_iter().map(Step::Block).collect())),
            log: Arc::new(Mutex::new(SourceLog::default())),
            repeat: None,
            open_error: None,
            start_error: None,
        }
    }

    /// A source that yields `block` forever once its script runs out.
    pub fn endless(block: Vec<u8>) -> Self {
        Self {
            repeat: Some(block),
            ..Self::new(Vec::new())
        }
    }

    pub fn failing_open(error: CaptureError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::new(Vec::new())
        }
    }

    pub fn failing_start(error: CaptureError) -> Self {
        Self {
            start_error: Some(error),
            ..Self::new(Vec::new())
        }
    }

    pub fn push_block(&self, block: Vec<u8>) {
        self.steps.lock().push_back(Step::Block(block));
    }

    pub fn push_fault(&self, message: &str) {
        self.steps.lock().push_back(Step::Fault(message.to_string()));
    }

    pub fn log(&self) -> SourceLog {
        self.log.lock().clone()
    }
}

impl SampleSource for ScriptedSource {
    fn open(&mut self, format: &AudioFormat) -> Result<usize, CaptureError> {
        self.log.lock().opened += 1;
        if let Some(ref e) = self.open_error {
            return Err(e.clone());
        }
        format.min_buffer_size()
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.log.lock().started += 1;
        match self.start_error {
            Some(ref e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        self.log.lock().reads += 1;

        let step = self.steps.lock().pop_front();
        let block = match step {
            Some(Step::Block(block)) => block,
            Some(Step::Fault(message)) => return Err(CaptureError::DeviceFailed(message)),
            None => match self.repeat {
                Some(ref block) => {
                    thread::sleep(Duration::from_millis(1));
                    block.clone()
                }
                None => {
                    thread::sleep(Duration::from_millis(1));
                    return Ok(0);
                }
            },
        };

        let n = block.len().min(buf.len());
        buf[..n].copy_from_slice(&block[..n]);
        if n < block.len() {
            self.steps.lock().push_front(Step::Block(block[n..].to_vec()));
        }
        Ok(n)
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.log.lock().stopped += 1;
        Ok(())
    }

    fn release(&mut self) -> Result<(), CaptureError> {
        self.log.lock().released += 1;
        Ok(())
    }

    fn device_info(&self) -> AudioDevice {
        AudioDevice {
            id: "scripted".into(),
            name: "Scripted Source".into(),
            is_default: false,
        }
    }
}

/// In-memory sink; clones share the buffer.
#[derive(Clone, Default)]
pub struct MemorySink {
    data: Arc<Mutex<Vec<u8>>>,
    finalized: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    pub fn is_finalized(&self) -> bool {
        *self.finalized.lock()
    }
}

impl ByteSink for MemorySink {
    fn append(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        if *self.finalized.lock() {
            return Err(CaptureError::StorageError("sink is closed".into()));
        }
        self.data.lock().extend_from_slice(data);
        Ok(())
    }

    fn finalize(&mut self) -> Result<u64, CaptureError> {
        *self.finalized.lock() = true;
        Ok(self.bytes_written())
    }

    fn bytes_written(&self) -> u64 {
        self.data.lock().len() as u64
    }
}

/// Sink that fails once an append would exceed `capacity` bytes, like a full disk.
pub struct FailingSink {
    inner: MemorySink,
    capacity: u64,
}

impl FailingSink {
    pub fn new(capacity: u64) -> Self {
        Self {
            inner: MemorySink::new(),
            capacity,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.is_finalized()
    }
}

impl ByteSink for FailingSink {
    fn append(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        if self.inner.bytes_written() + data.len() as u64 > self.capacity {
            return Err(CaptureError::StorageError("no space left on device".into()));
        }
        self.inner.append(data)
    }

    fn finalize(&mut self) -> Result<u64, CaptureError> {
        self.inner.finalize()
    }

    fn bytes_written(&self) -> u64 {
        self.inner.bytes_written()
    }
}
