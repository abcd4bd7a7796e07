//! # media-capture-core
//!
//! Platform-agnostic microphone capture pipeline.
//!
//! A hardware backend implements [`SampleSource`]; a [`CaptureSession`] drains
//! it on a dedicated worker into a headerless PCM file, and
//! [`convert_to_wav`] turns a finished capture into a playable WAV container.
//!
//! ## Architecture
//!
//! ```text
//! media-capture-core (this crate)
//! ├── traits/       ← SampleSource, ByteSink, CaptureDelegate
//! ├── models/       ← CaptureError, CaptureState, CaptureConfiguration, AudioFormat, etc.
//! ├── processing/   ← WAV header synthesis, PCM conversion + metering, RingBuffer
//! ├── session/      ← drain loop, CaptureSession (start/stop orchestrator)
//! └── storage/      ← RawFileSink, WAV conversion, metadata sidecars, cleanup
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioDevice, AudioFormat, AudioLevels};
pub use models::config::CaptureConfiguration;
pub use models::error::CaptureError;
pub use models::recording_result::{ContainerRecording, RecordingMetadata, RecordingResult};
pub use models::state::CaptureState;
pub use processing::ring_buffer::RingBuffer;
pub use processing::wav_format::{WavHeader, WAV_HEADER_SIZE};
pub use session::recorder::CaptureSession;
pub use storage::container::{convert_to_wav, inspect_wav};
pub use storage::library::purge_recordings;
pub use storage::raw_writer::RawFileSink;
pub use traits::byte_sink::ByteSink;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::sample_source::SampleSource;
