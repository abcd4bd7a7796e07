use super::error::CaptureError;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → recording → stopping → stopped
///            ↓                     ↓
///         failed ──────────→ (restart)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Recording { duration_secs: f64 },
    Stopping,
    Stopped,
    Failed(CaptureError),
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed(_))
    }

    /// Whether a new recording may be started from this state.
    pub fn can_start(&self) -> bool {
        self.is_idle() || self.is_terminal()
    }

    /// Short lowercase name, for logs and UI status lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording { .. } => "recording",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed(_) => "failed",
        }
    }

    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Recording { duration_secs } => Some(*duration_secs),
            _ => None,
        }
    }
}
