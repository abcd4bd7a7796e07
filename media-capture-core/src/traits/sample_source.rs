use crate::models::audio_models::{AudioDevice, AudioFormat};
use crate::models::error::CaptureError;

/// Interface for a hardware audio input that produces PCM byte blocks.
///
/// Lifecycle: `open` → `start` → `read`* → `stop` → `release`.
/// Implemented by:
/// - `CpalMicSource` (media-capture-cpal)
/// - test doubles replaying scripted blocks
///
/// A source is moved onto the drain worker for the duration of a recording,
/// so `read` is only ever called from that thread.
pub trait SampleSource: Send {
    /// Validate `format` and prepare the device.
    ///
    /// Returns the minimum block size in bytes. Fails with
    /// `ConfigurationFailed` when the format is unsupported or the derived
    /// buffer size is not strictly positive.
    fn open(&mut self, format: &AudioFormat) -> Result<usize, CaptureError>;

    /// Begin hardware capture. Microphone permission is assumed granted.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Read at most `buf.len()` bytes of captured audio into `buf`.
    ///
    /// `Ok(0)` means no data is available right now and is not an error.
    /// Implementations must return within a bounded time so a stop request
    /// is noticed promptly.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, CaptureError>;

    /// Halt hardware capture.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Free all device resources. Safe without `start`, idempotent.
    fn release(&mut self) -> Result<(), CaptureError>;

    /// Information about the device backing this source.
    fn device_info(&self) -> AudioDevice;
}
