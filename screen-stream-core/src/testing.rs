//! In-memory platform doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::AudioSourceKind;
use crate::models::authorization::{
    CaptureAuthorization, DisplayMetrics, SinkDescriptor, SurfaceHandle,
};
use crate::models::error::CaptureError;
use crate::models::state::CaptureEvent;
use crate::traits::authorization_requester::AuthorizationRequester;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::pcm_source::{PcmBufferCallback, PcmSource};
use crate::traits::projection::{Projection, ProjectionBackend, VirtualOutput, VirtualOutputRequest};

pub const SCREEN: DisplayMetrics = DisplayMetrics {
    width: 1080,
    height: 2400,
    density_dpi: 420,
};

pub fn authorization() -> CaptureAuthorization {
    CaptureAuthorization::from_result(CaptureAuthorization::RESULT_OK, vec![0xCA, 0xFE]).unwrap()
}

pub fn sink(surface: u64, width: u32, height: u32) -> SinkDescriptor {
    SinkDescriptor::new(SurfaceHandle(surface), width, height)
}

#[derive(Debug, Default)]
pub struct BackendLog {
    /// Errors returned, in order, by the next `open_projection` calls.
    pub open_failures: VecDeque<CaptureError>,
    /// Errors returned, in order, by the next `create_virtual_output` calls.
    pub create_failures: VecDeque<CaptureError>,
    pub projections_opened: usize,
    pub projections_stopped: usize,
    /// Projections stopped while one of their outputs was still live.
    pub stopped_with_live_output: usize,
    pub create_attempts: usize,
    pub live_outputs: usize,
    pub created: Vec<VirtualOutputRequest>,
    pub released: Vec<SinkDescriptor>,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    pub log: Arc<Mutex<BackendLog>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_create(&self, error: CaptureError) {
        self.log.lock().create_failures.push_back(error);
    }

    pub fn fail_next_open(&self, error: CaptureError) {
        self.log.lock().open_failures.push_back(error);
    }

    pub fn live_outputs(&self) -> usize {
        self.log.lock().live_outputs
    }

    pub fn create_attempts(&self) -> usize {
        self.log.lock().create_attempts
    }
}

impl ProjectionBackend for FakeBackend {
    fn display_metrics(&self) -> DisplayMetrics {
        SCREEN
    }

    fn open_projection(
        &self,
        authorization: &CaptureAuthorization,
    ) -> Result<Box<dyn Projection>, CaptureError> {
        assert!(!authorization.payload().is_empty());
        let mut log = self.log.lock();
        if let Some(error) = log.open_failures.pop_front() {
            return Err(error);
        }
        log.projections_opened += 1;
        Ok(Box::new(FakeProjection {
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeProjection {
    log: Arc<Mutex<BackendLog>>,
}

impl Projection for FakeProjection {
    fn create_virtual_output(
        &mut self,
        request: &VirtualOutputRequest,
    ) -> Result<Box<dyn VirtualOutput>, CaptureError> {
        let mut log = self.log.lock();
        log.create_attempts += 1;
        if let Some(error) = log.create_failures.pop_front() {
            return Err(error);
        }
        log.live_outputs += 1;
        log.created.push(request.clone());
        Ok(Box::new(FakeOutput {
            sink: request.sink,
            released: false,
            log: Arc::clone(&self.log),
        }))
    }

    fn stop(&mut self) {
        let mut log = self.log.lock();
        log.projections_stopped += 1;
        if log.live_outputs > 0 {
            log.stopped_with_live_output += 1;
        }
    }
}

struct FakeOutput {
    sink: SinkDescriptor,
    released: bool,
    log: Arc<Mutex<BackendLog>>,
}

impl VirtualOutput for FakeOutput {
    fn sink(&self) -> &SinkDescriptor {
        &self.sink
    }

    fn release(&mut self) {
        assert!(!self.released, "virtual output released twice");
        self.released = true;
        let mut log = self.log.lock();
        log.live_outputs -= 1;
        log.released.push(self.sink);
    }
}

/// Delegate that records every lifecycle callback.
#[derive(Default)]
pub struct RecordingDelegate {
    pub events: Mutex<Vec<CaptureEvent>>,
}

impl RecordingDelegate {
    pub fn events(&self) -> Vec<CaptureEvent> {
        self.events.lock().clone()
    }
}

impl CaptureDelegate for RecordingDelegate {
    fn on_capture_started(&self) {
        self.events.lock().push(CaptureEvent::Started);
    }

    fn on_capture_stopped(&self) {
        self.events.lock().push(CaptureEvent::Stopped);
    }

    fn on_capture_error(&self, error: &CaptureError) {
        self.events.lock().push(CaptureEvent::Error(error.clone()));
    }
}

#[derive(Default)]
pub struct CountingRequester {
    pub requests: Mutex<usize>,
}

impl AuthorizationRequester for CountingRequester {
    fn request_authorization(&self) {
        *self.requests.lock() += 1;
    }
}

/// PCM source whose buffers are pushed by the test through `emit`.
pub struct ManualSource {
    kind: AudioSourceKind,
    available: bool,
    pub callback: Arc<Mutex<Option<PcmBufferCallback>>>,
}

impl ManualSource {
    pub fn new(kind: AudioSourceKind, available: bool) -> Self {
        Self {
            kind,
            available,
            callback: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle for pushing buffers after the source was moved into a context.
    pub fn emitter(&self) -> Arc<Mutex<Option<PcmBufferCallback>>> {
        Arc::clone(&self.callback)
    }
}

impl PcmSource for ManualSource {
    fn kind(&self) -> AudioSourceKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn start(&mut self, callback: PcmBufferCallback) -> Result<(), CaptureError> {
        *self.callback.lock() = Some(callback);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        *self.callback.lock() = None;
        Ok(())
    }
}

pub fn emit(emitter: &Mutex<Option<PcmBufferCallback>>, data: &[u8]) -> bool {
    let callback = emitter.lock().clone();
    match callback {
        Some(callback) => {
            callback(data);
            true
        }
        None => false,
    }
}
