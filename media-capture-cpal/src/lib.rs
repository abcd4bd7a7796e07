//! # media-capture-cpal
//!
//! Cross-platform microphone backend for the media capture pipeline, built on cpal.
//!
//! Provides:
//! - `CpalMicSource` — `SampleSource` over a cpal input stream (16-bit PCM out)
//! - `device_enumerator` — input device listing and lookup
//! - `permissions` — microphone availability gate checked before recording
//!
//! ## Usage
//! ```ignore
//! use media_capture_cpal::CpalMicSource;
//! use media_capture_core::{CaptureConfiguration, CaptureSession};
//!
//! let mic = CpalMicSource::default_device()?;
//! let mut session = CaptureSession::new(mic);
//! session.start(CaptureConfiguration::default())?;
//! ```

pub mod cpal_mic;
pub mod device_enumerator;
pub mod permissions;

mod shared_buffer;

pub use cpal_mic::CpalMicSource;
pub use device_enumerator::list_input_devices;
pub use permissions::check_microphone_permission;
