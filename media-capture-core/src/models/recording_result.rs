use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::audio_models::AudioFormat;

/// Result returned when a capture session stops cleanly.
///
/// Describes the headerless raw PCM file the drain loop produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub bytes_written: u64,
    pub duration_secs: f64,
    pub started_at: DateTime<Utc>,
    pub format: AudioFormat,
}

/// A raw recording converted into a self-describing WAV container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRecording {
    pub file_path: PathBuf,
    pub data_size: u64,
    pub file_size: u64,
    pub checksum: String,
    pub metadata: RecordingMetadata,
}

/// Metadata stored alongside a finalized recording.
///
/// Serializable for the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub file_path: String,
    pub duration_secs: f64,
    pub data_size: u64,
    pub checksum: String,
    pub created_at: String,
    pub sample_rate_hz: u32,
    pub channel_count: u16,
    pub bits_per_sample: u16,
}

impl RecordingMetadata {
    pub fn new(file_path: &str, format: &AudioFormat, data_size: u64, checksum: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.to_string(),
            duration_secs: format.duration_secs(data_size),
            data_size,
            checksum: checksum.to_string(),
            created_at: Utc::now().to_rfc3339(),
            sample_rate_hz: format.sample_rate_hz,
            channel_count: format.channel_count,
            bits_per_sample: format.bits_per_sample,
        }
    }

    pub fn format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate_hz, self.channel_count, self.bits_per_sample)
    }
}
