use crate::models::authorization::{CaptureAuthorization, DisplayMetrics, SinkDescriptor};
use crate::models::error::CaptureError;

/// Host environment able to turn a capture authorization into projections.
///
/// Implemented by the platform layer (e.g. a media projection manager).
pub trait ProjectionBackend: Send + Sync {
    /// Physical screen parameters used for sink fallbacks and output density.
    fn display_metrics(&self) -> DisplayMetrics;

    /// Open a projection from a cached authorization.
    ///
    /// Fails with `AuthorizationRevoked` or `AuthorizationDenied` when the
    /// grant is no longer honored by the platform.
    fn open_projection(
        &self,
        authorization: &CaptureAuthorization,
    ) -> Result<Box<dyn Projection>, CaptureError>;
}

/// Parameters for a single virtual output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualOutputRequest {
    pub name: String,
    pub sink: SinkDescriptor,
    pub density_dpi: u32,
}

/// A live screen projection backed by an authorization.
pub trait Projection: Send {
    /// Mirror the screen into the requested sink.
    ///
    /// Permission-class errors mean the projection is dead and must be reopened.
    fn create_virtual_output(
        &mut self,
        request: &VirtualOutputRequest,
    ) -> Result<Box<dyn VirtualOutput>, CaptureError>;

    /// Stop the projection. Outputs created from it stop receiving frames.
    fn stop(&mut self);
}

/// An OS-mirrored rendering target feeding one sink surface.
pub trait VirtualOutput: Send {
    fn sink(&self) -> &SinkDescriptor;

    /// Release the platform resource. Called exactly once by the session manager.
    fn release(&mut self);
}
