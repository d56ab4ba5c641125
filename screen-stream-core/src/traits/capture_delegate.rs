use crate::models::error::CaptureError;

/// Event delegate for capture lifecycle notifications.
///
/// Called from whichever thread drove the transition (UI thread, platform
/// callback thread), never while the session's transition lock is held, so
/// implementations may call back into the `StreamContext`.
pub trait CaptureDelegate: Send + Sync {
    /// A virtual output is live and bound to the current sink.
    fn on_capture_started(&self);

    /// The virtual output was released and the screen is no longer mirrored.
    fn on_capture_stopped(&self);

    /// A session-level failure; `error` displays as the diagnostic reason.
    fn on_capture_error(&self, error: &CaptureError);
}
