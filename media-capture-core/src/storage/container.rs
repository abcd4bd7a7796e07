//! Post-processing of raw captures into WAV containers.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::models::audio_models::AudioFormat;
use crate::models::error::CaptureError;
use crate::models::recording_result::{ContainerRecording, RecordingMetadata};
use crate::processing::wav_format::{WavHeader, WAV_HEADER_SIZE};
use crate::storage::library::WAV_EXTENSION;
use crate::storage::metadata;

/// Convert a completed raw PCM capture into a WAV file next to it.
///
/// The output path is `raw_path` with its extension replaced by `wav`. The
/// file is the 44-byte header followed by a byte-for-byte copy of the raw
/// data, and is only reported as valid once its length equals
/// `44 + data_size`. A JSON metadata sidecar is written alongside.
///
/// A missing or empty raw file fails with `InvalidRecording` and produces no
/// output.
pub fn convert_to_wav(raw_path: &Path, format: &AudioFormat) -> Result<ContainerRecording, CaptureError> {
    format.validate()?;

    let data_size = match fs::metadata(raw_path) {
        Ok(meta) if meta.is_file() => meta.len(),
        Ok(_) => {
            return Err(CaptureError::InvalidRecording(format!(
                "{} is not a file",
                raw_path.display()
            )))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CaptureError::InvalidRecording(format!(
                "{} does not exist",
                raw_path.display()
            )))
        }
        Err(e) => return Err(CaptureError::storage("failed to stat raw recording", e)),
    };
    if data_size == 0 {
        return Err(CaptureError::InvalidRecording(format!(
            "{} is empty, nothing to convert",
            raw_path.display()
        )));
    }

    let output_path = raw_path.with_extension(WAV_EXTENSION);
    if output_path == raw_path {
        return Err(CaptureError::InvalidRecording(format!(
            "{} already has the container extension",
            raw_path.display()
        )));
    }

    let header = WavHeader::for_payload(format, data_size)?;
    let copied = write_container(raw_path, &output_path, &header)?;

    let file_size = fs::metadata(&output_path)
        .map_err(|e| CaptureError::storage("failed to stat container", e))?
        .len();
    let expected = WAV_HEADER_SIZE as u64 + data_size;
    if copied != data_size || file_size != expected {
        return Err(CaptureError::StorageError(format!(
            "incomplete container {}: {} bytes on disk, expected {}",
            output_path.display(),
            file_size,
            expected
        )));
    }

    let checksum = sha256_file(&output_path)?;
    let metadata = RecordingMetadata::new(&output_path.to_string_lossy(), format, data_size, &checksum);
    metadata::write_metadata(&metadata, &output_path)?;

    log::info!(
        "Converted {} into {} ({} bytes of audio, {:.2}s)",
        raw_path.display(),
        output_path.display(),
        data_size,
        metadata.duration_secs
    );

    Ok(ContainerRecording {
        file_path: output_path,
        data_size,
        file_size,
        checksum,
        metadata,
    })
}

/// Read and validate the header of a WAV file, checking it against the
/// file's actual length.
pub fn inspect_wav(path: &Path) -> Result<WavHeader, CaptureError> {
    let mut file = File::open(path).map_err(|e| CaptureError::storage("failed to open container", e))?;
    let mut bytes = [0u8; WAV_HEADER_SIZE];
    file.read_exact(&mut bytes)
        .map_err(|e| CaptureError::InvalidRecording(format!("truncated header: {}", e)))?;
    let header = WavHeader::parse(&bytes)?;

    let len = file
        .metadata()
        .map_err(|e| CaptureError::storage("failed to stat container", e))?
        .len();
    if len != header.file_size() {
        return Err(CaptureError::InvalidRecording(format!(
            "header declares {} bytes but file has {}",
            header.file_size(),
            len
        )));
    }
    Ok(header)
}

/// Write header + payload. Returns the number of payload bytes copied.
fn write_container(raw_path: &Path, output_path: &Path, header: &WavHeader) -> Result<u64, CaptureError> {
    let raw = File::open(raw_path).map_err(|e| CaptureError::storage("failed to open raw recording", e))?;
    let out = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(output_path)
        .map_err(|e| CaptureError::storage("failed to create container", e))?;

    let mut writer = BufWriter::new(out);
    writer
        .write_all(&header.to_bytes())
        .map_err(|e| CaptureError::storage("failed to write header", e))?;

    // Only copy what the header promises, even if the raw file grows meanwhile.
    let mut reader = BufReader::new(raw).take(header.data_size as u64);
    let copied = io::copy(&mut reader, &mut writer)
        .map_err(|e| CaptureError::storage("failed to copy audio data", e))?;

    let file = writer
        .into_inner()
        .map_err(|e| CaptureError::storage("failed to flush container", e.into_error()))?;
    file.sync_all()
        .map_err(|e| CaptureError::storage("failed to sync container", e))?;
    Ok(copied)
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let mut file = File::open(path).map_err(|e| CaptureError::storage("failed to read file for checksum", e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| CaptureError::storage("failed to read file for checksum", e))?;
    Ok(hex_encode(&hasher.finalize()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn raw_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn converts_1000_bytes_mono_16bit() {
        let dir = tempfile::tempdir().unwrap();
        let payload: Vec<u8> = (0..1000u32).map(|i| (i % 251) as u8).collect();
        let raw = raw_file(dir.path(), "AUDIO_20261018_120000.pcm", &payload);

        let result = convert_to_wav(&raw, &AudioFormat::new(44100, 1, 16)).unwrap();

        assert_eq!(result.file_path, dir.path().join("AUDIO_20261018_120000.wav"));
        assert_eq!(result.data_size, 1000);
        assert_eq!(result.file_size, 1044);

        let bytes = fs::read(&result.file_path).unwrap();
        assert_eq!(bytes.len(), 1044);
        let header = WavHeader::parse(&bytes).unwrap();
        assert_eq!(header.byte_rate, 88200);
        assert_eq!(header.block_align, 2);
        assert_eq!(header.total_size, 1036);
        assert_eq!(header.data_size, 1000);
        assert_eq!(&bytes[44..], payload.as_slice());

        // raw capture is left untouched
        assert_eq!(fs::read(&raw).unwrap(), payload);
    }

    #[test]
    fn empty_raw_file_is_rejected_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_file(dir.path(), "empty.pcm", &[]);

        let result = convert_to_wav(&raw, &AudioFormat::cd_mono());
        assert!(matches!(result, Err(CaptureError::InvalidRecording(_))));
        assert!(!dir.path().join("empty.wav").exists());
        assert!(!dir.path().join("empty.metadata.json").exists());
    }

    #[test]
    fn missing_raw_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = convert_to_wav(&dir.path().join("gone.pcm"), &AudioFormat::cd_mono());
        assert!(matches!(result, Err(CaptureError::InvalidRecording(_))));
        assert!(!dir.path().join("gone.wav").exists());
    }

    #[test]
    fn invalid_format_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_file(dir.path(), "a.pcm", &[0; 8]);
        let result = convert_to_wav(&raw, &AudioFormat::new(44100, 0, 16));
        assert!(matches!(result, Err(CaptureError::ConfigurationFailed(_))));
    }

    #[test]
    fn checksum_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_file(dir.path(), "take.pcm", &[0u8; 4]);

        let result = convert_to_wav(&raw, &AudioFormat::new(8000, 2, 16)).unwrap();
        assert_eq!(result.checksum.len(), 64);
        assert_eq!(result.checksum, sha256_file(&result.file_path).unwrap());

        let sidecar = metadata::read_metadata(&result.file_path).unwrap();
        assert_eq!(sidecar, result.metadata);
        assert_eq!(sidecar.data_size, 4);
        assert_eq!(sidecar.channel_count, 2);
    }

    #[test]
    fn inspect_accepts_converted_file() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_file(dir.path(), "ok.pcm", &[1u8; 10]);
        let result = convert_to_wav(&raw, &AudioFormat::cd_mono()).unwrap();

        let header = inspect_wav(&result.file_path).unwrap();
        assert_eq!(header.data_size, 10);
        assert_eq!(header.format(), AudioFormat::cd_mono());
    }

    #[test]
    fn inspect_detects_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let raw = raw_file(dir.path(), "cut.pcm", &[1u8; 100]);
        let result = convert_to_wav(&raw, &AudioFormat::cd_mono()).unwrap();

        let bytes = fs::read(&result.file_path).unwrap();
        fs::write(&result.file_path, &bytes[..80]).unwrap();

        assert!(matches!(
            inspect_wav(&result.file_path),
            Err(CaptureError::InvalidRecording(_))
        ));
    }

    #[test]
    fn hex_encoding() {
        assert_eq!(hex_encode(&[0x00, 0xab, 0x10]), "00ab10");
    }
}
