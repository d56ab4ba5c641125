use std::mem;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::authorization::{CaptureAuthorization, DisplayMetrics, SinkDescriptor};
use crate::models::config::StreamConfiguration;
use crate::models::error::CaptureError;
use crate::models::state::{CaptureEvent, StreamState};
use crate::models::status::StreamStatus;
use crate::traits::projection::{Projection, ProjectionBackend, VirtualOutput, VirtualOutputRequest};

/// Owns the cached capture authorization, the projection opened from it, and
/// the virtual output bound to the current sink.
///
/// Not internally synchronized: every method is a state transition and the
/// caller (`StreamContext`) runs them one at a time under its transition lock.
/// Lifecycle signals are queued during a transition and drained afterwards
/// with [`SessionManager::take_events`].
///
/// Recovery policy: when the platform rejects an output with a
/// permission-class error, the projection is reopened from the cached
/// authorization and the output is created once more. A second failure
/// demotes the session to `Authorized` and is reported; there is no further
/// retry.
pub struct SessionManager {
    backend: Arc<dyn ProjectionBackend>,
    metrics: DisplayMetrics,
    output_name: String,
    state: StreamState,
    authorization: Option<CaptureAuthorization>,
    projection: Option<Box<dyn Projection>>,
    output: Option<Box<dyn VirtualOutput>>,
    sink: Option<SinkDescriptor>,
    session_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    recreation_attempts: u64,
    /// A consent flow was asked for and its result has not arrived yet.
    request_outstanding: bool,
    /// A consent flow must be asked for once the transition lock is released.
    request_queued: bool,
    events: Vec<CaptureEvent>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn ProjectionBackend>, config: &StreamConfiguration) -> Self {
        let metrics = backend.display_metrics();
        log::info!(
            "Session manager ready, screen {}x{} @ {} dpi",
            metrics.width,
            metrics.height,
            metrics.density_dpi
        );
        Self {
            backend,
            metrics,
            output_name: config.virtual_output_name.clone(),
            state: StreamState::Idle,
            authorization: None,
            projection: None,
            output: None,
            sink: None,
            session_id: None,
            started_at: None,
            recreation_attempts: 0,
            request_outstanding: false,
            request_queued: false,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state.is_streaming()
    }

    pub fn has_authorization(&self) -> bool {
        self.authorization.is_some()
    }

    /// The sink the session is bound to, or waiting for.
    pub fn sink(&self) -> Option<SinkDescriptor> {
        self.sink
    }

    pub fn display_metrics(&self) -> DisplayMetrics {
        self.metrics
    }

    pub fn status(&self) -> StreamStatus {
        StreamStatus {
            state: self.state,
            has_authorization: self.has_authorization(),
            sink: self.sink,
            session_id: self.session_id,
            started_at: self.started_at.map(|t| t.to_rfc3339()),
            recreation_attempts: self.recreation_attempts,
        }
    }

    /// Drain the lifecycle signals recorded since the last call.
    pub fn take_events(&mut self) -> Vec<CaptureEvent> {
        mem::take(&mut self.events)
    }

    /// Whether a consent flow must be started by the caller, clearing the flag.
    pub fn take_authorization_request(&mut self) -> bool {
        mem::take(&mut self.request_queued)
    }

    /// Prepare for an external consent flow.
    ///
    /// Returns `false` when an authorization is already cached or a request
    /// is still awaiting its result. Otherwise moves to `AuthPending`, queues
    /// one request for [`SessionManager::take_authorization_request`], and
    /// returns `true`.
    pub fn begin_authorization(&mut self) -> Result<bool, CaptureError> {
        self.ensure_active()?;
        if self.authorization.is_some() {
            log::info!("Authorization already cached, skipping request");
            return Ok(false);
        }
        self.state = StreamState::AuthPending;
        if self.request_outstanding {
            log::debug!("Authorization request already in flight");
            return Ok(false);
        }
        log::info!("Requesting capture authorization");
        self.request_outstanding = true;
        self.request_queued = true;
        Ok(true)
    }

    /// Apply the outcome of a consent flow.
    ///
    /// A grant is cached and, if a sink is already known, streaming starts on
    /// it. A denial leaves any previously cached grant in place.
    pub fn on_authorization_result(
        &mut self,
        result: Result<CaptureAuthorization, CaptureError>,
    ) -> Result<(), CaptureError> {
        self.ensure_active()?;
        self.request_outstanding = false;
        match result {
            Ok(authorization) => {
                log::info!("Capture authorization granted");
                self.install_authorization(authorization);
                if self.sink.is_some() {
                    self.bind_sink()
                } else {
                    self.state = StreamState::Authorized;
                    Ok(())
                }
            }
            Err(e) => {
                log::warn!("Capture authorization refused: {}", e);
                if !self.state.is_streaming() {
                    self.state = StreamState::at_rest(self.has_authorization());
                }
                self.events.push(CaptureEvent::Error(e.clone()));
                Err(e)
            }
        }
    }

    /// Start mirroring into `sink`.
    ///
    /// Without any authorization (passed or cached) the sink is remembered,
    /// a consent flow is requested (once), and streaming begins when the
    /// grant arrives. Starting an already streaming session re-binds it to `sink`.
    pub fn start(
        &mut self,
        authorization: Option<CaptureAuthorization>,
        sink: SinkDescriptor,
    ) -> Result<(), CaptureError> {
        self.ensure_active()?;
        let sink = self.accept_sink(sink)?;
        if let Some(authorization) = authorization {
            self.install_authorization(authorization);
        }
        self.sink = Some(sink);

        if self.authorization.is_none() {
            log::info!(
                "No authorization yet, waiting to stream to {}x{}",
                sink.width,
                sink.height
            );
            self.begin_authorization()?;
            return Ok(());
        }
        self.bind_sink()
    }

    /// Re-bind the stream to a new surface or resolution.
    ///
    /// While streaming, the old output is released and a new one created with
    /// the same authorization; the session stays `Streaming` throughout.
    /// Otherwise this behaves like `start` with the cached authorization.
    pub fn update_sink(&mut self, sink: SinkDescriptor) -> Result<(), CaptureError> {
        self.ensure_active()?;
        if !self.state.is_streaming() {
            return self.start(None, sink);
        }

        let sink = self.accept_sink(sink)?;
        log::debug!("Updating sink to {}x{}", sink.width, sink.height);
        self.sink = Some(sink);
        self.bind_sink()
    }

    /// Platform signal that the projection stopped honoring the grant.
    ///
    /// The dead output and projection are dropped while the authorization is
    /// kept. A streaming session gets exactly one recreation pass.
    pub fn handle_revocation(&mut self) -> Result<(), CaptureError> {
        self.ensure_active()?;
        log::warn!("Projection revoked by platform");

        let was_streaming = self.state.is_streaming();
        self.release_output();
        self.close_projection();

        let request = match self.output_request() {
            Some(request) if was_streaming => request,
            _ => {
                if self.state != StreamState::AuthPending {
                    self.state = StreamState::at_rest(self.has_authorization());
                }
                return Ok(());
            }
        };

        self.recreation_attempts += 1;
        match self.try_create_output(&request) {
            Ok(output) => {
                log::info!("Stream recovered after revocation");
                self.output = Some(output);
                Ok(())
            }
            Err(e) => {
                self.close_projection();
                let e = Self::classify_retry_failure(e);
                log::error!("Recovery after revocation failed: {}", e);
                self.end_streaming();
                self.events.push(CaptureEvent::Error(e.clone()));
                Err(e)
            }
        }
    }

    /// Release the output resource. Idempotent; the authorization is kept.
    pub fn stop(&mut self) {
        if self.state.is_released() {
            return;
        }

        let was_streaming = self.state.is_streaming();
        self.release_output();
        self.sink = None;
        self.session_id = None;
        self.started_at = None;
        self.state = StreamState::at_rest(self.has_authorization());

        if was_streaming {
            log::info!("Stream stopped");
            self.events.push(CaptureEvent::Stopped);
        }
    }

    /// Stop and also forget the cached authorization.
    pub fn release_all(&mut self) {
        if self.state.is_released() {
            return;
        }

        self.stop();
        self.close_projection();
        self.authorization = None;
        self.request_outstanding = false;
        self.request_queued = false;
        self.state = StreamState::Idle;
        log::info!("Session released, including cached authorization");
    }

    /// Terminal teardown. Every later transition fails with `Released`.
    pub fn shutdown(&mut self) {
        self.release_all();
        self.state = StreamState::Released;
    }

    // --- Internal helpers ---

    fn ensure_active(&self) -> Result<(), CaptureError> {
        if self.state.is_released() {
            return Err(CaptureError::Released);
        }
        Ok(())
    }

    fn accept_sink(&mut self, sink: SinkDescriptor) -> Result<SinkDescriptor, CaptureError> {
        if let Err(e) = sink.validate() {
            log::warn!("Rejected sink: {}", e);
            self.events.push(CaptureEvent::Error(e.clone()));
            return Err(e);
        }
        Ok(sink.resolved(&self.metrics))
    }

    fn install_authorization(&mut self, authorization: CaptureAuthorization) {
        if self.authorization.as_ref() == Some(&authorization) {
            return;
        }
        // The open projection and its output belong to the previous grant.
        self.release_output();
        self.close_projection();
        self.authorization = Some(authorization);
    }

    fn output_request(&self) -> Option<VirtualOutputRequest> {
        self.sink.map(|sink| VirtualOutputRequest {
            name: self.output_name.clone(),
            sink,
            density_dpi: self.metrics.density_dpi,
        })
    }

    /// Replace any live output with one bound to the current sink.
    fn bind_sink(&mut self) -> Result<(), CaptureError> {
        let Some(request) = self.output_request() else {
            return Err(CaptureError::InvalidSink("no sink to bind".into()));
        };
        let was_streaming = self.state.is_streaming();
        self.release_output();

        match self.create_output_with_retry(&request) {
            Ok(output) => {
                self.output = Some(output);
                if was_streaming {
                    log::info!("Stream re-bound to {}x{}", request.sink.width, request.sink.height);
                } else {
                    let session_id = Uuid::new_v4();
                    log::info!(
                        "Stream {} started at {}x{}",
                        session_id,
                        request.sink.width,
                        request.sink.height
                    );
                    self.state = StreamState::Streaming;
                    self.session_id = Some(session_id);
                    self.started_at = Some(Utc::now());
                    self.events.push(CaptureEvent::Started);
                }
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to create virtual output: {}", e);
                if was_streaming {
                    self.end_streaming();
                } else {
                    self.state = StreamState::at_rest(self.has_authorization());
                }
                self.events.push(CaptureEvent::Error(e.clone()));
                Err(e)
            }
        }
    }

    fn create_output_with_retry(
        &mut self,
        request: &VirtualOutputRequest,
    ) -> Result<Box<dyn VirtualOutput>, CaptureError> {
        match self.try_create_output(request) {
            Ok(output) => Ok(output),
            Err(e) if e.is_permission_class() => {
                log::warn!(
                    "Projection rejected output ({}), recreating from cached authorization",
                    e
                );
                self.close_projection();
                self.recreation_attempts += 1;
                self.try_create_output(request).map_err(|retry| {
                    self.close_projection();
                    Self::classify_retry_failure(retry)
                })
            }
            Err(e) => Err(e),
        }
    }

    fn try_create_output(
        &mut self,
        request: &VirtualOutputRequest,
    ) -> Result<Box<dyn VirtualOutput>, CaptureError> {
        if self.projection.is_none() {
            let authorization = self
                .authorization
                .as_ref()
                .ok_or(CaptureError::AuthorizationDenied)?;
            self.projection = Some(self.backend.open_projection(authorization)?);
        }
        match self.projection.as_mut() {
            Some(projection) => projection.create_virtual_output(request),
            None => Err(CaptureError::AuthorizationRevoked),
        }
    }

    fn classify_retry_failure(error: CaptureError) -> CaptureError {
        if error.is_permission_class() {
            CaptureError::AuthorizationRevoked
        } else {
            error
        }
    }

    /// Demote a streaming session whose output could not be kept alive.
    fn end_streaming(&mut self) {
        self.state = StreamState::at_rest(self.has_authorization());
        self.session_id = None;
        self.started_at = None;
        self.events.push(CaptureEvent::Stopped);
    }

    fn release_output(&mut self) {
        if let Some(mut output) = self.output.take() {
            let sink = *output.sink();
            output.release();
            log::debug!("Released virtual output for {}x{}", sink.width, sink.height);
        }
    }

    fn close_projection(&mut self) {
        if let Some(mut projection) = self.projection.take() {
            projection.stop();
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.release_output();
        self.close_projection();
    }
}
