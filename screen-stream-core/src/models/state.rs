use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → auth_pending → authorized → streaming ⟲ (sink update)
///   ↑                       ↑   ↓        ↓
///   └──── release_all ──────┴── stop / revocation
///
/// any → released (shutdown, terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    Idle,
    AuthPending,
    Authorized,
    Streaming,
    Released,
}

impl StreamState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Streaming)
    }

    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released)
    }

    /// Resting state for a session that holds no output resource.
    pub fn at_rest(has_authorization: bool) -> Self {
        if has_authorization {
            Self::Authorized
        } else {
            Self::Idle
        }
    }
}

/// Observable lifecycle signal recorded by the session manager during a
/// transition and delivered to the `CaptureDelegate` afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Started,
    Stopped,
    Error(CaptureError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_rest_depends_on_authorization() {
        assert_eq!(StreamState::at_rest(true), StreamState::Authorized);
        assert_eq!(StreamState::at_rest(false), StreamState::Idle);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&StreamState::AuthPending).unwrap();
        assert_eq!(json, "\"auth_pending\"");
    }
}
