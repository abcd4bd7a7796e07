use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::traits::byte_sink::ByteSink;

/// Streaming writer for headerless PCM captures.
///
/// Owned by the drain worker for the lifetime of a recording.
///
/// ## File Format
///
/// ```text
/// [block 1 bytes][block 2 bytes]...
/// ```
///
/// No header is written; [`convert_to_wav`](crate::storage::container::convert_to_wav)
/// produces a playable container once the total size is known.
pub struct RawFileSink {
    file_path: PathBuf,
    writer: Option<BufWriter<File>>,
    total_bytes_written: u64,
    finalized: bool,
}

impl RawFileSink {
    /// Create the output file, failing if it already exists.
    ///
    /// Missing parent directories are created.
    pub fn create(file_path: PathBuf) -> Result<Self, CaptureError> {
        if let Some(parent) = file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| CaptureError::storage("failed to create directory", e))?;
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&file_path)
            .map_err(|e| CaptureError::storage("failed to create file", e))?;

        log::debug!("Opened raw capture file {}", file_path.display());

        Ok(Self {
            file_path,
            writer: Some(BufWriter::new(file)),
            total_bytes_written: 0,
            finalized: false,
        })
    }

    /// Path of the output file.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

impl ByteSink for RawFileSink {
    fn append(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open for writing".into()))?;
        writer
            .write_all(data)
            .map_err(|e| CaptureError::storage("write failed", e))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> Result<u64, CaptureError> {
        if self.finalized {
            return Ok(self.total_bytes_written);
        }
        self.finalized = true;

        if let Some(writer) = self.writer.take() {
            let file = writer
                .into_inner()
                .map_err(|e| CaptureError::storage("flush failed", e.into_error()))?;
            file.sync_all()
                .map_err(|e| CaptureError::storage("sync failed", e))?;
        }

        log::debug!(
            "Closed raw capture file {} ({} bytes)",
            self.file_path.display(),
            self.total_bytes_written
        );
        Ok(self.total_bytes_written)
    }

    fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }
}
