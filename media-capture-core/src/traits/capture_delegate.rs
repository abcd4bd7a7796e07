use crate::models::audio_models::AudioLevels;
use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::CaptureState;

/// Event delegate for capture session notifications.
///
/// State changes and the finished callback fire on the thread calling into
/// the session. Level updates and errors fire on the drain worker.
/// Implementations should marshal to a UI thread if needed.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the session state changes.
    fn on_state_changed(&self, state: &CaptureState);

    /// Called at most every 100 ms while recording.
    fn on_levels_updated(&self, levels: &AudioLevels);

    /// Called when the drain worker hits a fatal error.
    fn on_error(&self, error: &CaptureError);

    /// Called when the raw recording has been finalized.
    fn on_capture_finished(&self, result: &RecordingResult);
}
