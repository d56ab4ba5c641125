use thiserror::Error;

/// Errors that can occur while streaming screen content and mixed audio.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user or platform refused the capture grant.
    #[error("authorization denied")]
    AuthorizationDenied,

    /// A previously valid grant stopped working mid-session.
    #[error("authorization revoked")]
    AuthorizationRevoked,

    #[error("resource creation failed: {0}")]
    ResourceCreationFailed(String),

    #[error("invalid sink: {0}")]
    InvalidSink(String),

    #[error("invalid audio frame: {0}")]
    InvalidFrame(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("stream context not initialized")]
    NotInitialized,

    #[error("stream context already released")]
    Released,

    #[error("screen mode is not active")]
    ScreenModeInactive,

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Whether this error means the grant backing a projection is no longer usable.
    ///
    /// Permission-class failures are the only ones worth a recreation attempt
    /// with the cached authorization.
    pub fn is_permission_class(&self) -> bool {
        matches!(self, Self::AuthorizationDenied | Self::AuthorizationRevoked)
    }
}
