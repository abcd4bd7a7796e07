use std::io::Write;

use media_capture_core::{AudioLevels, CaptureDelegate, CaptureError, CaptureState, RecordingResult};

/// CaptureDelegate that reports session events on the terminal.
///
/// Levels are drawn as a single meter line on stderr; everything else goes
/// through the log.
pub struct ConsoleDelegate {
    meter_width: usize,
}

impl ConsoleDelegate {
    pub fn new() -> Self {
        Self { meter_width: 30 }
    }

    fn meter(&self, levels: &AudioLevels) -> String {
        let filled = ((levels.rms.clamp(0.0, 1.0) * self.meter_width as f32).round() as usize).min(self.meter_width);
        format!(
            "[{}{}] peak {:>5.1}%",
            "#".repeat(filled),
            " ".repeat(self.meter_width - filled),
            levels.peak * 100.0
        )
    }
}

impl Default for ConsoleDelegate {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDelegate for ConsoleDelegate {
    fn on_state_changed(&self, state: &CaptureState) {
        match state {
            CaptureState::Recording { duration_secs } if *duration_secs > 0.0 => {}
            CaptureState::Failed(e) => log::error!("Recording failed: {}", e),
            other => log::info!("Recorder {}", other.name()),
        }
    }

    fn on_levels_updated(&self, levels: &AudioLevels) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", self.meter(levels));
        let _ = stderr.flush();
    }

    fn on_error(&self, error: &CaptureError) {
        eprintln!();
        log::error!("Capture error: {}", error);
    }

    fn on_capture_finished(&self, result: &RecordingResult) {
        eprintln!();
        log::info!(
            "Captured {} bytes ({:.1}s) to {}",
            result.bytes_written,
            result.duration_secs,
            result.file_path.display()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meter_scales_with_rms() {
        let delegate = ConsoleDelegate::new();
        let silent = delegate.meter(&AudioLevels::default());
        let loud = delegate.meter(&AudioLevels { rms: 1.0, peak: 1.0 });

        assert!(!silent.contains('#'));
        assert_eq!(loud.matches('#').count(), 30);
        assert!(loud.ends_with("100.0%"));
    }
}
