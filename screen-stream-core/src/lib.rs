//! # screen-stream-core
//!
//! Platform-agnostic core for replacing a camera and microphone feed with
//! mirrored screen content and mixed audio.
//!
//! Provides the capture session state machine, drop-oldest audio queues, the
//! real-time PCM mixer, and a single `StreamContext` that serializes session
//! transitions. Platform bindings implement the traits in `traits/` and plug
//! into the context.
//!
//! ## Architecture
//!
//! ```text
//! screen-stream-core (this crate)
//! ├── traits/       ← ProjectionBackend, Projection, VirtualOutput,
//! │                   AuthorizationRequester, CaptureDelegate, PcmSource, ModeFlags
//! ├── models/       ← CaptureError, StreamState, StreamConfiguration,
//! │                   CaptureAuthorization, SinkDescriptor, AudioFrame,
//! │                   MixerDiagnostics, StreamStatus
//! ├── processing/   ← PCM helpers, BoundedQueue, MixerEngine
//! └── session/      ← SessionManager (state machine), StreamContext (facade)
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioFrame, AudioSourceKind, ChannelLayout, MixerDiagnostics};
pub use models::authorization::{
    CaptureAuthorization, DisplayMetrics, SinkDescriptor, SurfaceHandle,
};
pub use models::config::StreamConfiguration;
pub use models::error::CaptureError;
pub use models::state::{CaptureEvent, StreamState};
pub use models::status::StreamStatus;
pub use processing::bounded_queue::BoundedQueue;
pub use processing::mixer_engine::MixerEngine;
pub use session::context::StreamContext;
pub use session::manager::SessionManager;
pub use traits::authorization_requester::AuthorizationRequester;
pub use traits::capture_delegate::CaptureDelegate;
pub use traits::mode_flags::{ModeFlags, StaticModeFlags};
pub use traits::pcm_source::{PcmBufferCallback, PcmSource};
pub use traits::projection::{Projection, ProjectionBackend, VirtualOutput, VirtualOutputRequest};
