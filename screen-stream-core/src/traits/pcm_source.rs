use std::sync::Arc;

use crate::models::audio_models::AudioSourceKind;
use crate::models::error::CaptureError;

/// Callback invoked when a raw PCM buffer is available.
///
/// Receives interleaved 16-bit little-endian bytes: stereo for system audio,
/// mono for the microphone, both at the process-wide sample rate.
pub type PcmBufferCallback = Arc<dyn Fn(&[u8]) + Send + Sync + 'static>;

/// Interface for platform-specific audio capture sources.
///
/// Implementations run their own reader loop and push every buffer through
/// the callback. They must never block inside the callback.
pub trait PcmSource: Send {
    /// Which mixer input this source feeds.
    fn kind(&self) -> AudioSourceKind;

    /// Whether this capture source is currently available.
    fn is_available(&self) -> bool;

    /// Start capturing audio, delivering buffers via `callback`.
    fn start(&mut self, callback: PcmBufferCallback) -> Result<(), CaptureError>;

    /// Stop capturing and release resources.
    fn stop(&mut self) -> Result<(), CaptureError>;
}
