use std::path::PathBuf;

use super::audio_models::AudioFormat;
use super::error::CaptureError;

/// Configuration for a capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfiguration {
    /// Sample format requested from the source (default: 44.1 kHz mono 16-bit).
    pub format: AudioFormat,

    /// Directory where raw recording files are written.
    pub output_directory: PathBuf,

    /// Type tag prefixed to generated file names (default: "AUDIO").
    pub file_tag: String,

    /// Bytes requested per source read. `None` uses the source's minimum.
    pub block_size: Option<usize>,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), CaptureError> {
        self.format.validate()?;
        if self.block_size == Some(0) {
            return Err(CaptureError::ConfigurationFailed(
                "block size must be positive".into(),
            ));
        }
        if self.file_tag.is_empty() || self.file_tag.contains(std::path::is_separator) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "invalid file tag: {:?}",
                self.file_tag
            )));
        }
        Ok(())
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            output_directory: PathBuf::from("."),
            file_tag: "AUDIO".into(),
            block_size: None,
        }
    }
}
