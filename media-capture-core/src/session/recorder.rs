use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevice, AudioFormat, AudioLevels};
use crate::models::config::CaptureConfiguration;
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;
use crate::processing::pcm;
use crate::session::drain;
use crate::storage::library::{self, RAW_EXTENSION};
use crate::storage::raw_writer::RawFileSink;
use crate::traits::byte_sink::ByteSink;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::sample_source::SampleSource;

/// Minimum spacing between level notifications to the delegate.
const LEVEL_INTERVAL: Duration = Duration::from_millis(100);

/// Internal mutable session state, protected by `parking_lot::Mutex`.
///
/// Written by the drain worker while recording, read by the control thread.
struct SessionState {
    state: CaptureState,
    levels: AudioLevels,
    bytes_written: u64,
    started_at: Option<DateTime<Utc>>,
    output_path: Option<PathBuf>,
    last_level_emit: Option<Instant>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            levels: AudioLevels::default(),
            bytes_written: 0,
            started_at: None,
            output_path: None,
            last_level_emit: None,
        }
    }
}

/// What the drain worker hands back when it exits.
struct WorkerOutcome<S> {
    source: S,
    result: Result<u64, CaptureError>,
}

/// Orchestrates one microphone recording at a time.
///
/// Generic over the hardware backend via the `SampleSource` trait. The
/// control thread calls `start`/`stop`; a dedicated "audio-drain" worker
/// owns the source and the output sink while recording:
/// ```text
/// [SampleSource] → read → [drain worker] → append → [ByteSink (raw .pcm)]
///                               │
///                               └→ levels / byte count → SessionState
/// ```
/// `stop` joins the worker before releasing the source, so no byte is
/// written after it returns.
pub struct CaptureSession<S: SampleSource + 'static> {
    source: Option<S>,
    device: AudioDevice,
    config: Option<CaptureConfiguration>,
    session_state: Arc<Mutex<SessionState>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,

    // Cross-thread stop signal observed by the drain worker
    running: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<WorkerOutcome<S>>>,
}

impl<S: SampleSource + 'static> CaptureSession<S> {
    pub fn new(source: S) -> Self {
        let device = source.device_info();
        Self {
            source: Some(source),
            device,
            config: None,
            session_state: Arc::new(Mutex::new(SessionState::new())),
            delegate: None,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> CaptureState {
        self.session_state.lock().state.clone()
    }

    pub fn current_levels(&self) -> AudioLevels {
        self.session_state.lock().levels
    }

    /// Bytes appended to the output of the current (or last) recording.
    pub fn bytes_written(&self) -> u64 {
        self.session_state.lock().bytes_written
    }

    /// Output file of the current (or last) recording.
    pub fn output_path(&self) -> Option<PathBuf> {
        self.session_state.lock().output_path.clone()
    }

    /// Device backing this session's source.
    pub fn device_info(&self) -> &AudioDevice {
        &self.device
    }

    pub fn is_recording(&self) -> bool {
        self.worker.is_some()
    }

    /// Start recording into `<output_directory>/<TAG>_<timestamp>.pcm`.
    ///
    /// Transitions: idle/stopped/failed → recording. Returns the raw output path.
    pub fn start(&mut self, config: CaptureConfiguration) -> Result<PathBuf, CaptureError> {
        self.begin(config, |config| {
            let path = library::recording_path(
                &config.output_directory,
                &config.file_tag,
                RAW_EXTENSION,
                Local::now(),
            );
            let sink = RawFileSink::create(path.clone())?;
            Ok((Box::new(sink) as Box<dyn ByteSink>, path))
        })
    }

    /// Start recording into a caller-provided sink. `output_path` is only
    /// reported back in the result.
    pub fn start_with_sink<K: ByteSink + 'static>(
        &mut self,
        config: CaptureConfiguration,
        sink: K,
        output_path: PathBuf,
    ) -> Result<PathBuf, CaptureError> {
        self.begin(config, move |_| Ok((Box::new(sink) as Box<dyn ByteSink>, output_path)))
    }

    /// Stop recording and finalize the raw file.
    ///
    /// Transitions: recording → stopping → stopped, or → failed when the
    /// worker hit a fatal error. Blocks until the drain worker has exited.
    pub fn stop(&mut self) -> Result<RecordingResult, CaptureError> {
        let Some(worker) = self.worker.take() else {
            return Err(CaptureError::InvalidState(format!(
                "cannot stop from {} state",
                self.state().name()
            )));
        };

        if self.state().is_recording() {
            self.set_state(CaptureState::Stopping);
        }

        self.running.store(false, Ordering::SeqCst);

        let outcome = match worker.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                let error = CaptureError::DeviceFailed("drain worker panicked".into());
                log::error!("{}", error);
                self.set_state(CaptureState::Failed(error.clone()));
                return Err(error);
            }
        };

        let mut source = outcome.source;
        if let Err(e) = source.stop() {
            log::warn!("Failed to stop capture source: {}", e);
        }
        if let Err(e) = source.release() {
            log::warn!("Failed to release capture source: {}", e);
        }
        self.source = Some(source);

        let bytes_written = match outcome.result {
            Ok(bytes) => bytes,
            Err(error) => {
                self.set_state(CaptureState::Failed(error.clone()));
                return Err(error);
            }
        };

        let (file_path, started_at) = {
            let mut s = self.session_state.lock();
            s.bytes_written = bytes_written;
            (
                s.output_path.clone().unwrap_or_default(),
                s.started_at.unwrap_or_else(Utc::now),
            )
        };
        let format = self.config.as_ref().map(|c| c.format).unwrap_or_default();

        let result = RecordingResult {
            file_path,
            bytes_written,
            duration_secs: format.duration_secs(bytes_written),
            started_at,
            format,
        };

        log::info!(
            "Recording stopped: {} ({} bytes, {:.2}s)",
            result.file_path.display(),
            result.bytes_written,
            result.duration_secs
        );

        self.set_state(CaptureState::Stopped);
        if let Some(ref delegate) = self.delegate {
            delegate.on_capture_finished(&result);
        }

        Ok(result)
    }

    // --- Internal helpers ---

    fn begin<F>(&mut self, config: CaptureConfiguration, make_sink: F) -> Result<PathBuf, CaptureError>
    where
        F: FnOnce(&CaptureConfiguration) -> Result<(Box<dyn ByteSink>, PathBuf), CaptureError>,
    {
        {
            let state = &self.session_state.lock().state;
            if self.worker.is_some() || !state.can_start() {
                return Err(CaptureError::InvalidState(format!(
                    "cannot start from {} state",
                    state.name()
                )));
            }
        }

        config.validate()?;

        let mut source = self
            .source
            .take()
            .ok_or_else(|| CaptureError::InvalidState("capture source is unavailable".into()))?;

        let min_block = match source.open(&config.format) {
            Ok(size) => size,
            Err(e) => return Err(self.abandon_start(source, e)),
        };
        if let Err(e) = source.start() {
            return Err(self.abandon_start(source, e));
        }

        let (mut sink, output_path) = match make_sink(&config) {
            Ok(pair) => pair,
            Err(e) => {
                let _ = source.stop();
                return Err(self.abandon_start(source, e));
            }
        };

        let block_size = config.block_size.unwrap_or(min_block);
        let format = config.format;

        {
            let mut s = self.session_state.lock();
            s.levels = AudioLevels::default();
            s.bytes_written = 0;
            s.started_at = Some(Utc::now());
            s.output_path = Some(output_path.clone());
            s.last_level_emit = None;
        }

        // Recording must be visible before the worker can report a failure.
        self.set_state(CaptureState::Recording { duration_secs: 0.0 });

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let session_state = Arc::clone(&self.session_state);
        let delegate = self.delegate.clone();

        let handle = thread::Builder::new()
            .name("audio-drain".into())
            .spawn(move || {
                let result = drain::run_drain_loop(&mut source, sink.as_mut(), &running, block_size, |block, total| {
                    Self::record_block(&session_state, delegate.as_deref(), &format, block, total);
                });

                if let Err(ref e) = result {
                    log::error!("Recording aborted: {}", e);
                    session_state.lock().state = CaptureState::Failed(e.clone());
                    if let Some(ref d) = delegate {
                        d.on_error(e);
                        d.on_state_changed(&CaptureState::Failed(e.clone()));
                    }
                }

                WorkerOutcome { source, result }
            })
            .map_err(|e| CaptureError::DeviceFailed(format!("failed to spawn drain worker: {}", e)));

        let handle = match handle {
            Ok(handle) => handle,
            Err(error) => {
                // The source went down with the unspawned closure.
                self.running.store(false, Ordering::SeqCst);
                log::error!("{}", error);
                self.set_state(CaptureState::Failed(error.clone()));
                return Err(error);
            }
        };

        self.worker = Some(handle);
        self.config = Some(config);

        log::info!(
            "Recording started on {} into {} ({} Hz, {} ch, {} bit, {} byte blocks)",
            self.device.name,
            output_path.display(),
            format.sample_rate_hz,
            format.channel_count,
            format.bits_per_sample,
            block_size
        );

        Ok(output_path)
    }

    /// Release a source that failed to start and put it back.
    fn abandon_start(&mut self, mut source: S, error: CaptureError) -> CaptureError {
        if let Err(e) = source.release() {
            log::warn!("Failed to release capture source: {}", e);
        }
        self.source = Some(source);
        log::error!("Failed to start recording: {}", error);
        error
    }

    /// Per-block bookkeeping on the drain worker.
    fn record_block(
        session_state: &Mutex<SessionState>,
        delegate: Option<&dyn CaptureDelegate>,
        format: &AudioFormat,
        block: &[u8],
        total: u64,
    ) {
        let levels = pcm::measure_levels(block, format);

        let emit = {
            let mut s = session_state.lock();
            s.bytes_written = total;
            s.levels = levels;
            if let CaptureState::Recording { .. } = s.state {
                s.state = CaptureState::Recording {
                    duration_secs: format.duration_secs(total),
                };
            }

            let due = s
                .last_level_emit
                .map_or(true, |last| last.elapsed() >= LEVEL_INTERVAL);
            if due {
                s.last_level_emit = Some(Instant::now());
            }
            due
        };

        if emit {
            if let Some(d) = delegate {
                d.on_levels_updated(&levels);
            }
        }
    }

    fn set_state(&self, new_state: CaptureState) {
        {
            let mut s = self.session_state.lock();
            if s.state == new_state {
                return;
            }
            s.state = new_state.clone();
        }
        log::debug!("Capture state → {}", new_state.name());
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }
}

impl<S: SampleSource + 'static> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            log::debug!("Dropping active capture session, stopping");
            if let Err(e) = self.stop() {
                log::warn!("Recording ended with error during drop: {}", e);
            }
        }
    }
}

/// Wait until `predicate` holds or `timeout` elapses. Returns whether it held.
///
/// Convenience for callers that poll a session from a non-UI thread.
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut predicate: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    predicate()
}
