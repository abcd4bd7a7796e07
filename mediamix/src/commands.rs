use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use media_capture_core::session::recorder::wait_until;
use media_capture_core::storage::library::{RAW_EXTENSION, WAV_EXTENSION};
use media_capture_core::storage::metadata::read_metadata;
use media_capture_core::{
    convert_to_wav, purge_recordings, AudioFormat, CaptureConfiguration, CaptureSession, ContainerRecording,
};
use media_capture_cpal::{check_microphone_permission, list_input_devices, CpalMicSource};

use crate::console_delegate::ConsoleDelegate;
use crate::settings::AppSettings;

/// Info about a saved recording, as shown by `list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingInfo {
    pub file_path: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub is_container: bool,
    pub created_at: String,
    pub duration_secs: Option<f64>,
}

/// Record from the microphone for `seconds`, then convert to WAV unless `raw`.
pub fn record(settings: &AppSettings, seconds: u64, raw: bool, device: Option<String>) -> Result<()> {
    if !check_microphone_permission()? {
        bail!("microphone access is not available");
    }

    let mic = match device {
        Some(name) => CpalMicSource::with_device(name),
        None => CpalMicSource::default_device()?,
    };

    let mut session = CaptureSession::new(mic);
    session.set_delegate(Arc::new(ConsoleDelegate::new()));

    let config = CaptureConfiguration {
        format: settings.format,
        output_directory: settings.recordings_dir(),
        ..Default::default()
    };

    let raw_path = session.start(config)?;
    log::info!(
        "Recording {}s from {} into {}",
        seconds,
        session.device_info().name,
        raw_path.display()
    );

    // Returns early if the drain worker fails.
    wait_until(Duration::from_secs(seconds), || !session.state().is_recording());
    let result = session.stop()?;

    if raw {
        println!("{}", result.file_path.display());
        return Ok(());
    }

    let container = convert_to_wav(&result.file_path, &result.format)?;
    print_container(&container);
    Ok(())
}

/// Wrap an existing raw PCM file in a WAV container.
pub fn convert(raw_path: &Path, format: AudioFormat) -> Result<ContainerRecording> {
    let container = convert_to_wav(raw_path, &format)
        .with_context(|| format!("failed to convert {}", raw_path.display()))?;
    Ok(container)
}

pub fn print_container(container: &ContainerRecording) {
    println!(
        "{}  {} bytes  {:.2}s  sha256 {}",
        container.file_path.display(),
        container.file_size,
        container.metadata.duration_secs,
        container.checksum
    );
}

pub fn devices() -> Result<()> {
    let devices = list_input_devices()?;
    if devices.is_empty() {
        println!("No input devices found");
    }
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {}", marker, device.name);
    }
    Ok(())
}

/// Recordings in `dir`, newest first. A missing directory lists as empty.
pub fn list_recordings(dir: &Path) -> Result<Vec<RecordingInfo>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", dir.display())),
    };

    let mut recordings = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if extension != RAW_EXTENSION && extension != WAV_EXTENSION {
            continue;
        }

        let meta = entry.metadata().with_context(|| format!("failed to stat {}", path.display()))?;
        if !meta.is_file() {
            continue;
        }
        let created_at = meta
            .modified()
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339())
            .unwrap_or_default();
        let is_container = extension == WAV_EXTENSION;
        let duration_secs = if is_container {
            read_metadata(&path).ok().map(|m| m.duration_secs)
        } else {
            None
        };

        recordings.push(RecordingInfo {
            file_path: path.to_string_lossy().to_string(),
            file_name: entry.file_name().to_string_lossy().to_string(),
            size_bytes: meta.len(),
            is_container,
            created_at,
            duration_secs,
        });
    }

    recordings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.file_name.cmp(&b.file_name)));
    Ok(recordings)
}

/// Delete one recording by file name, plus its metadata sidecar if present.
pub fn delete_recording(dir: &Path, file_name: &str) -> Result<PathBuf> {
    if file_name.contains(std::path::is_separator) {
        bail!("expected a file name, got {:?}", file_name);
    }
    let path = dir.join(file_name);
    if !path.is_file() {
        bail!("no recording named {:?} in {}", file_name, dir.display());
    }
    fs::remove_file(&path).with_context(|| format!("failed to delete {}", path.display()))?;

    let sidecar = media_capture_core::storage::metadata::metadata_path(&path);
    if sidecar.is_file() {
        if let Err(e) = fs::remove_file(&sidecar) {
            log::warn!("Failed to delete {}: {}", sidecar.display(), e);
        }
    }
    Ok(path)
}

/// Delete every file in the recordings directory.
pub fn clean(dir: &Path) -> Result<usize> {
    let removed = purge_recordings(&[dir])?;
    log::info!("Deleted {} file(s) from {}", removed, dir.display());
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_raw(dir: &Path, name: &str, len: usize) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, vec![0x11u8; len]).unwrap();
        path
    }

    #[test]
    fn convert_writes_container_and_sidecar() {
        let dir = TempDir::new().unwrap();
        let raw = write_raw(dir.path(), "AUDIO_20240101_120000.pcm", 1000);

        let container = convert(&raw, AudioFormat::cd_mono()).unwrap();

        assert_eq!(container.file_size, 1044);
        assert_eq!(container.file_path.extension().unwrap(), "wav");

        let listed = list_recordings(dir.path()).unwrap();
        let wav = listed.iter().find(|r| r.is_container).unwrap();
        assert_eq!(wav.size_bytes, 1044);
        assert!(wav.duration_secs.is_some());
    }

    #[test]
    fn convert_empty_file_fails() {
        let dir = TempDir::new().unwrap();
        let raw = write_raw(dir.path(), "AUDIO_empty.pcm", 0);

        assert!(convert(&raw, AudioFormat::cd_mono()).is_err());
        assert_eq!(list_recordings(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn list_skips_sidecars_and_other_files() {
        let dir = TempDir::new().unwrap();
        write_raw(dir.path(), "AUDIO_a.pcm", 10);
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("AUDIO_a.metadata.json"), "{}").unwrap();

        let listed = list_recordings(dir.path()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_name, "AUDIO_a.pcm");
        assert!(!listed[0].is_container);
    }

    #[test]
    fn list_missing_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(list_recordings(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn delete_removes_recording_and_sidecar() {
        let dir = TempDir::new().unwrap();
        let raw = write_raw(dir.path(), "AUDIO_b.pcm", 100);
        let container = convert(&raw, AudioFormat::cd_mono()).unwrap();
        let file_name = container.file_path.file_name().unwrap().to_string_lossy().to_string();

        delete_recording(dir.path(), &file_name).unwrap();

        assert!(!container.file_path.exists());
        assert!(!media_capture_core::storage::metadata::metadata_path(&container.file_path).exists());
        assert!(raw.exists());
    }

    #[test]
    fn delete_rejects_paths_and_unknown_names() {
        let dir = TempDir::new().unwrap();
        assert!(delete_recording(dir.path(), "../etc/passwd").is_err());
        assert!(delete_recording(dir.path(), "missing.wav").is_err());
    }

    #[test]
    fn clean_empties_directory() {
        let dir = TempDir::new().unwrap();
        write_raw(dir.path(), "AUDIO_1.pcm", 4);
        write_raw(dir.path(), "AUDIO_2.pcm", 4);

        assert_eq!(clean(dir.path()).unwrap(), 2);
        assert!(list_recordings(dir.path()).unwrap().is_empty());
    }
}
