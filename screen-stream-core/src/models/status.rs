use serde::Serialize;
use uuid::Uuid;

use super::authorization::SinkDescriptor;
use super::error::CaptureError;
use super::state::StreamState;

/// Point-in-time view of the capture session, serializable for the host bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamStatus {
    pub state: StreamState,
    pub has_authorization: bool,
    pub sink: Option<SinkDescriptor>,
    /// Identifier of the current streaming session, if any.
    pub session_id: Option<Uuid>,
    /// RFC 3339 timestamp of when the current streaming session started.
    pub started_at: Option<String>,
    /// Total bounded recreation attempts made against the cached authorization.
    pub recreation_attempts: u64,
}

impl StreamStatus {
    pub fn to_json(&self) -> Result<String, CaptureError> {
        serde_json::to_string(self)
            .map_err(|e| CaptureError::Unknown(format!("status serialization failed: {}", e)))
    }
}
