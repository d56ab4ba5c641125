use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// A user-approved, revocable screen capture grant.
///
/// Holds everything needed to reopen a projection without prompting the user
/// again: the platform status code and the opaque result payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureAuthorization {
    result_code: i32,
    payload: Vec<u8>,
}

impl CaptureAuthorization {
    /// Status code the platform reports for an accepted consent flow.
    pub const RESULT_OK: i32 = -1;

    /// Build an authorization from a consent-flow result.
    ///
    /// Anything other than `RESULT_OK` with a non-empty payload is a denial.
    pub fn from_result(result_code: i32, payload: Vec<u8>) -> Result<Self, CaptureError> {
        if result_code != Self::RESULT_OK || payload.is_empty() {
            return Err(CaptureError::AuthorizationDenied);
        }
        Ok(Self { result_code, payload })
    }

    pub fn result_code(&self) -> i32 {
        self.result_code
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Opaque handle to a frame-consuming surface owned by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceHandle(pub u64);

impl SurfaceHandle {
    pub const NULL: Self = Self(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// The destination a virtual output mirrors the screen into.
///
/// Width or height of 0 means "use the screen size".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkDescriptor {
    pub surface: SurfaceHandle,
    pub width: u32,
    pub height: u32,
}

impl SinkDescriptor {
    pub fn new(surface: SurfaceHandle, width: u32, height: u32) -> Self {
        Self { surface, width, height }
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.surface.is_null() {
            return Err(CaptureError::InvalidSink("surface handle is null".into()));
        }
        Ok(())
    }

    /// Fill in missing dimensions from the physical display.
    pub fn resolved(self, metrics: &DisplayMetrics) -> Self {
        Self {
            surface: self.surface,
            width: if self.width > 0 { self.width } else { metrics.width },
            height: if self.height > 0 { self.height } else { metrics.height },
        }
    }
}

/// Physical screen parameters reported by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMetrics {
    pub width: u32,
    pub height: u32,
    pub density_dpi: u32,
}
