//! Input device enumeration via the cpal default host.
//!
//! cpal has no stable device IDs, so the device name doubles as its ID.

use cpal::traits::{DeviceTrait, HostTrait};

use media_capture_core::models::audio_models::AudioDevice;
use media_capture_core::models::error::CaptureError;

/// List input (microphone) devices on the default host.
pub fn list_input_devices() -> Result<Vec<AudioDevice>, CaptureError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::DeviceFailed(format!("failed to enumerate input devices: {}", e)))?;

    let mut result = Vec::new();
    for device in devices {
        let name = match device.name() {
            Ok(name) => name,
            Err(e) => {
                log::debug!("Skipping input device without a name: {}", e);
                continue;
            }
        };
        result.push(AudioDevice {
            id: name.clone(),
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
        });
    }
    Ok(result)
}

/// Find an input device by name, or the default input device for `None`.
pub fn find_input_device(name: Option<&str>) -> Result<cpal::Device, CaptureError> {
    let host = cpal::default_host();
    let Some(name) = name else {
        return host.default_input_device().ok_or(CaptureError::DeviceNotAvailable);
    };

    let mut devices = host
        .input_devices()
        .map_err(|e| CaptureError::DeviceFailed(format!("failed to enumerate input devices: {}", e)))?;
    devices
        .find(|d| d.name().map(|n| n == name).unwrap_or(false))
        .ok_or(CaptureError::DeviceNotAvailable)
}
