//! Recording file naming and cleanup.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::models::error::CaptureError;

/// Extension of headerless captures.
pub const RAW_EXTENSION: &str = "pcm";

/// Extension of finalized containers.
pub const WAV_EXTENSION: &str = "wav";

/// Build `<dir>/<TAG>_<yyyyMMdd_HHmmss>.<ext>`.
///
/// If that name is already taken, `-1`, `-2`, … is appended to the stem until
/// a free name is found.
pub fn recording_path(dir: &Path, tag: &str, extension: &str, timestamp: DateTime<Local>) -> PathBuf {
    let stem = format!("{}_{}", tag, timestamp.format("%Y%m%d_%H%M%S"));
    let mut candidate = dir.join(format!("{}.{}", stem, extension));
    let mut suffix = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}-{}.{}", stem, suffix, extension));
        suffix += 1;
    }
    candidate
}

/// Delete every regular file in each of `dirs`.
///
/// Directories that do not exist count as empty. Subdirectories are left
/// alone. Returns the number of files removed.
pub fn purge_recordings<P: AsRef<Path>>(dirs: &[P]) -> Result<usize, CaptureError> {
    let mut removed = 0;
    for dir in dirs {
        let dir = dir.as_ref();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(CaptureError::storage("failed to list recordings", e)),
        };

        for entry in entries {
            let entry = entry.map_err(|e| CaptureError::storage("failed to list recordings", e))?;
            let is_file = entry
                .file_type()
                .map(|t| t.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("Failed to delete {}: {}", entry.path().display(), e),
            }
        }
    }

    log::info!("Deleted {} recording file(s)", removed);
    Ok(removed)
}
