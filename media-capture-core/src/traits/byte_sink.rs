use crate::models::error::CaptureError;

/// Sequential consumer for captured bytes.
///
/// Bytes must land in the exact order they are appended.
pub trait ByteSink: Send {
    /// Append `data` verbatim after everything written so far.
    fn append(&mut self, data: &[u8]) -> Result<(), CaptureError>;

    /// Flush and close the sink. Returns the total number of bytes written.
    ///
    /// Calling `finalize` on an already finalized sink returns the same total.
    fn finalize(&mut self) -> Result<u64, CaptureError>;

    /// Total bytes appended so far.
    fn bytes_written(&self) -> u64;
}
