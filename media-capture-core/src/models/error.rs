use thiserror::Error;

/// Errors that can occur while capturing, storing or converting audio.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not available")]
    DeviceNotAvailable,

    #[error("device failed: {0}")]
    DeviceFailed(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("invalid recording: {0}")]
    InvalidRecording(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl CaptureError {
    /// Wrap an I/O failure with a short description of what was being done.
    pub(crate) fn storage(context: &str, err: std::io::Error) -> Self {
        Self::StorageError(format!("{}: {}", context, err))
    }
}
