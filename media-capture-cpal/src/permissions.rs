//! Microphone permission gate.
//!
//! Desktop hosts rarely expose an explicit consent API. Access is considered
//! granted when the default input device can be queried for its supported
//! configurations; platforms that block the microphone fail that query.

use cpal::traits::{DeviceTrait, HostTrait};

use media_capture_core::models::error::CaptureError;

/// Check if microphone access is available.
///
/// Returns `Ok(false)` when there is no input device or the host refuses
/// access to it.
pub fn check_microphone_permission() -> Result<bool, CaptureError> {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        return Ok(false);
    };

    match device.supported_input_configs() {
        Ok(mut configs) => Ok(configs.next().is_some()),
        Err(cpal::SupportedStreamConfigsError::DeviceNotAvailable) => Ok(false),
        Err(e) => {
            if looks_like_denial(&e.to_string()) {
                Ok(false)
            } else {
                // Other error — assume available but report
                log::warn!("Unexpected error checking mic permission: {}", e);
                Ok(true)
            }
        }
    }
}

/// Whether a backend error message describes an access denial.
pub(crate) fn looks_like_denial(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["permission", "denied", "not authorized", "unauthorized"]
        .iter()
        .any(|needle| message.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_messages() {
        assert!(looks_like_denial("Access Denied (os error 13)"));
        assert!(looks_like_denial("Permission to record audio not granted"));
        assert!(!looks_like_denial("device busy"));
    }
}
