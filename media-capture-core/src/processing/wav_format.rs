//! WAV container header synthesis.
//!
//! Builds and parses the canonical 44-byte RIFF/WAVE header that turns a
//! headerless PCM capture into a file any player can open.

use crate::models::audio_models::AudioFormat;
use crate::models::error::CaptureError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// PCM `fmt ` chunk body size.
const FMT_CHUNK_SIZE: u32 = 16;

/// WAVE_FORMAT_PCM.
const PCM_FORMAT_TAG: u16 = 1;

/// Decoded fields of a 44-byte PCM WAV header.
///
/// Layout (all integers little-endian):
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    total_size = 36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bits / 8
/// [32-33]  block_align = channels * bits / 8
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub total_size: u32,
    pub channel_count: u16,
    pub sample_rate_hz: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
}

impl WavHeader {
    /// Compute the header for `data_size` bytes of PCM in `format`.
    ///
    /// Fails with `InvalidRecording` if the payload does not fit the 32-bit
    /// RIFF size fields.
    pub fn for_payload(format: &AudioFormat, data_size: u64) -> Result<Self, CaptureError> {
        let max_payload = (u32::MAX - (WAV_HEADER_SIZE as u32 - 8)) as u64;
        if data_size > max_payload {
            return Err(CaptureError::InvalidRecording(format!(
                "{} bytes of audio exceed the WAV size limit",
                data_size
            )));
        }
        let data_size = data_size as u32;

        Ok(Self {
            total_size: WAV_HEADER_SIZE as u32 - 8 + data_size,
            channel_count: format.channel_count,
            sample_rate_hz: format.sample_rate_hz,
            byte_rate: format.byte_rate(),
            block_align: format.block_align(),
            bits_per_sample: format.bits_per_sample,
            data_size,
        })
    }

    pub fn to_bytes(&self) -> [u8; WAV_HEADER_SIZE] {
        let mut header = [0u8; WAV_HEADER_SIZE];

        // RIFF chunk descriptor
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&self.total_size.to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        // fmt sub-chunk
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
        header[20..22].copy_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
        header[22..24].copy_from_slice(&self.channel_count.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate_hz.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate.to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align.to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());

        // data sub-chunk
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_size.to_le_bytes());

        header
    }

    /// Parse a canonical PCM header. Rejects anything that is not the exact
    /// 44-byte layout produced by [`WavHeader::to_bytes`].
    pub fn parse(bytes: &[u8]) -> Result<Self, CaptureError> {
        if bytes.len() < WAV_HEADER_SIZE {
            return Err(CaptureError::InvalidRecording(format!(
                "header is {} bytes, expected {}",
                bytes.len(),
                WAV_HEADER_SIZE
            )));
        }

        for (range, tag) in [(0..4, b"RIFF"), (8..12, b"WAVE"), (12..16, b"fmt "), (36..40, b"data")] {
            if &bytes[range.clone()] != tag {
                return Err(CaptureError::InvalidRecording(format!(
                    "missing {:?} tag at offset {}",
                    String::from_utf8_lossy(tag),
                    range.start
                )));
            }
        }

        if le_u32(bytes, 16) != FMT_CHUNK_SIZE || le_u16(bytes, 20) != PCM_FORMAT_TAG {
            return Err(CaptureError::InvalidRecording("not a PCM fmt chunk".into()));
        }

        Ok(Self {
            total_size: le_u32(bytes, 4),
            channel_count: le_u16(bytes, 22),
            sample_rate_hz: le_u32(bytes, 24),
            byte_rate: le_u32(bytes, 28),
            block_align: le_u16(bytes, 32),
            bits_per_sample: le_u16(bytes, 34),
            data_size: le_u32(bytes, 40),
        })
    }

    pub fn format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate_hz, self.channel_count, self.bits_per_sample)
    }

    /// Size of the complete file this header describes.
    pub fn file_size(&self) -> u64 {
        WAV_HEADER_SIZE as u64 + self.data_size as u64
    }
}

fn le_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn le_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
