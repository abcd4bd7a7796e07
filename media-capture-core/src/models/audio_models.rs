use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Milliseconds of audio held by the smallest block a source hands out.
pub const MIN_BUFFER_MILLIS: u64 = 40;

/// PCM sample format requested from a capture source.
///
/// Immutable for the lifetime of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate_hz: u32,
    pub channel_count: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    pub const fn new(sample_rate_hz: u32, channel_count: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate_hz,
            channel_count,
            bits_per_sample,
        }
    }

    /// 44.1 kHz mono 16-bit, the recorder's default.
    pub const fn cd_mono() -> Self {
        Self::new(44100, 1, 16)
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.sample_rate_hz == 0 {
            return Err(CaptureError::ConfigurationFailed(
                "sample rate must be positive".into(),
            ));
        }
        if ![1, 2].contains(&self.channel_count) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "unsupported channel count: {}",
                self.channel_count
            )));
        }
        if ![8, 16, 24, 32].contains(&self.bits_per_sample) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "unsupported bits per sample: {}",
                self.bits_per_sample
            )));
        }
        Ok(())
    }

    /// Bytes per frame (one sample for every channel).
    pub fn block_align(&self) -> u16 {
        self.channel_count * self.bits_per_sample / 8
    }

    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate_hz * self.channel_count as u32 * self.bits_per_sample as u32 / 8
    }

    /// Smallest block a source should be read with: [`MIN_BUFFER_MILLIS`] of
    /// audio rounded up to a whole frame.
    ///
    /// Fails with `ConfigurationFailed` if the format is invalid or the derived
    /// size is not strictly positive.
    pub fn min_buffer_size(&self) -> Result<usize, CaptureError> {
        self.validate()?;

        let frame = self.block_align() as u64;
        let frames = (self.sample_rate_hz as u64 * MIN_BUFFER_MILLIS).div_ceil(1000);
        let size = frames
            .checked_mul(frame)
            .and_then(|s| usize::try_from(s).ok())
            .unwrap_or(0);

        if size == 0 {
            return Err(CaptureError::ConfigurationFailed(format!(
                "derived buffer size is not positive for {:?}",
                self
            )));
        }
        Ok(size)
    }

    /// Playback duration of `bytes` of audio in this format.
    pub fn duration_secs(&self, bytes: u64) -> f64 {
        let rate = self.byte_rate();
        if rate == 0 {
            return 0.0;
        }
        bytes as f64 / rate as f64
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::cd_mono()
    }
}

/// An audio input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioDevice {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Level metering of the most recent block (RMS and peak, 0.0–1.0).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AudioLevels {
    pub rms: f32,
    pub peak: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_rates() {
        let format = AudioFormat::new(44100, 1, 16);
        assert_eq!(format.byte_rate(), 88200);
        assert_eq!(format.block_align(), 2);

        let stereo = AudioFormat::new(48000, 2, 16);
        assert_eq!(stereo.byte_rate(), 192000);
        assert_eq!(stereo.block_align(), 4);
    }

    #[test]
    fn min_buffer_is_whole_frames() {
        let format = AudioFormat::new(44100, 1, 16);
        // 44100 * 40 / 1000 = 1764 frames
        assert_eq!(format.min_buffer_size().unwrap(), 3528);

        let odd = AudioFormat::new(8001, 2, 24);
        let size = odd.min_buffer_size().unwrap();
        assert!(size > 0);
        assert_eq!(size % odd.block_align() as usize, 0);
    }

    #[test]
    fn min_buffer_positive_for_all_valid_formats() {
        for rate in [1, 8000, 11025, 16000, 22050, 44100, 48000, 96000, 192000] {
            for channels in [1, 2] {
                for bits in [8, 16, 24, 32] {
                    let format = AudioFormat::new(rate, channels, bits);
                    assert!(format.min_buffer_size().unwrap() > 0, "{:?}", format);
                }
            }
        }
    }

    #[test]
    fn invalid_formats_are_configuration_errors() {
        for format in [
            AudioFormat::new(0, 1, 16),
            AudioFormat::new(44100, 0, 16),
            AudioFormat::new(44100, 3, 16),
            AudioFormat::new(44100, 1, 0),
            AudioFormat::new(44100, 1, 12),
        ] {
            assert!(matches!(
                format.min_buffer_size(),
                Err(CaptureError::ConfigurationFailed(_))
            ));
        }
    }

    #[test]
    fn duration_from_bytes() {
        let format = AudioFormat::cd_mono();
        assert!((format.duration_secs(88200) - 1.0).abs() < 1e-9);
        assert_eq!(format.duration_secs(0), 0.0);
    }
}
