//! PCM sample conversion and level metering.
//!
//! Capture backends deliver samples in whatever type the device prefers;
//! these helpers turn them into little-endian integer PCM bytes and meter
//! blocks for the recorder UI.

use crate::models::audio_models::{AudioFormat, AudioLevels};

/// Append f32 samples to `out` as 16-bit little-endian PCM.
///
/// Out-of-range samples are clamped to [-1.0, 1.0].
pub fn extend_pcm16_from_f32(out: &mut Vec<u8>, samples: &[f32]) {
    out.reserve(samples.len() * 2);
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        let value = (clamped * i16::MAX as f32) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Append i16 samples to `out` as 16-bit little-endian PCM.
pub fn extend_pcm16_from_i16(out: &mut Vec<u8>, samples: &[i16]) {
    out.reserve(samples.len() * 2);
    for &sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

/// Decode one integer PCM sample to [-1.0, 1.0].
///
/// 8-bit PCM is unsigned; wider depths are signed little-endian.
fn normalized_sample(bytes: &[u8]) -> f32 {
    match bytes.len() {
        1 => (bytes[0] as f32 - 128.0) / 128.0,
        2 => i16::from_le_bytes([bytes[0], bytes[1]]) as f32 / 32768.0,
        3 => {
            let value = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8;
            value as f32 / 8_388_608.0
        }
        4 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32 / 2_147_483_648.0,
        _ => 0.0,
    }
}

/// RMS and peak level of a block of PCM bytes in `format`.
///
/// A trailing partial sample is ignored.
pub fn measure_levels(block: &[u8], format: &AudioFormat) -> AudioLevels {
    let width = (format.bits_per_sample / 8) as usize;
    if width == 0 {
        return AudioLevels::default();
    }

    let mut sum_sq = 0.0f64;
    let mut peak = 0.0f32;
    let mut count = 0usize;
    for chunk in block.chunks_exact(width) {
        let sample = normalized_sample(chunk);
        sum_sq += (sample as f64) * (sample as f64);
        peak = peak.max(sample.abs());
        count += 1;
    }

    if count == 0 {
        return AudioLevels::default();
    }

    AudioLevels {
        rms: (sum_sq / count as f64).sqrt() as f32,
        peak: peak.min(1.0),
    }
}
