use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};

use crate::models::audio_models::{AudioFrame, MixerDiagnostics};
use crate::models::authorization::{CaptureAuthorization, SinkDescriptor};
use crate::models::config::StreamConfiguration;
use crate::models::error::CaptureError;
use crate::models::state::CaptureEvent;
use crate::models::status::StreamStatus;
use crate::processing::mixer_engine::MixerEngine;
use crate::session::manager::SessionManager;
use crate::traits::authorization_requester::AuthorizationRequester;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::mode_flags::{ModeFlags, StaticModeFlags};
use crate::traits::pcm_source::{PcmBufferCallback, PcmSource};
use crate::traits::projection::ProjectionBackend;

/// Single access point coordinating the capture session and the audio mixer.
///
/// Construct one per process and share it (usually behind an `Arc`) with the
/// platform glue. Lifecycle: `new` → `init` once → any number of stream and
/// audio calls → `shutdown` once.
///
/// ```text
/// platform callbacks ──┐                     ┌─→ SessionManager ─→ ProjectionBackend
///   (UI, projection,   ├→ StreamContext ─────┤
///    audio readers)  ──┘   transition lock   └─→ MixerEngine ─→ poll_mixed_audio
/// ```
///
/// All session transitions are serialized by one lock. Delegate callbacks are
/// delivered after that lock is released, in the order the transition
/// produced them.
pub struct StreamContext {
    config: StreamConfiguration,
    session: Mutex<Option<SessionManager>>,
    mixer: OnceCell<Arc<MixerEngine>>,
    delegate: RwLock<Option<Arc<dyn CaptureDelegate>>>,
    requester: RwLock<Option<Arc<dyn AuthorizationRequester>>>,
    mode_flags: RwLock<Arc<dyn ModeFlags>>,
    audio_sources: Mutex<Vec<Box<dyn PcmSource>>>,
    shut_down: Arc<AtomicBool>,
}

impl StreamContext {
    pub fn new(config: StreamConfiguration) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(Self {
            config,
            session: Mutex::new(None),
            mixer: OnceCell::new(),
            delegate: RwLock::new(None),
            requester: RwLock::new(None),
            mode_flags: RwLock::new(Arc::new(StaticModeFlags::default())),
            audio_sources: Mutex::new(Vec::new()),
            shut_down: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &StreamConfiguration {
        &self.config
    }

    /// Bind the host environment. Later calls are no-ops.
    pub fn init(&self, backend: Arc<dyn ProjectionBackend>) -> Result<(), CaptureError> {
        self.ensure_active()?;
        let mut session = self.session.lock();
        if session.is_some() {
            log::debug!("Stream context already initialized");
            return Ok(());
        }
        *session = Some(SessionManager::new(backend, &self.config));
        log::info!("Stream context initialized");
        Ok(())
    }

    pub fn set_delegate(&self, delegate: Arc<dyn CaptureDelegate>) {
        *self.delegate.write() = Some(delegate);
    }

    pub fn set_authorization_requester(&self, requester: Arc<dyn AuthorizationRequester>) {
        *self.requester.write() = Some(requester);
    }

    pub fn set_mode_flags(&self, flags: Arc<dyn ModeFlags>) {
        *self.mode_flags.write() = flags;
    }

    /// Whether screen content should replace the camera feed right now.
    pub fn is_screen_mode_active(&self) -> bool {
        let flags = self.mode_flags.read();
        flags.screen_mode_enabled() && !flags.capture_disabled()
    }

    // --- Session transitions ---

    /// Ask the host to run its consent flow.
    ///
    /// Returns `false` without contacting the requester when an authorization
    /// is already cached or a request is still awaiting its result.
    pub fn request_authorization(&self) -> Result<bool, CaptureError> {
        self.with_session(|session| session.begin_authorization())
    }

    /// Deliver the outcome of the consent flow.
    ///
    /// `result_code` must be `CaptureAuthorization::RESULT_OK` and `payload`
    /// non-empty for the grant to be accepted.
    pub fn on_authorization_result(
        &self,
        result_code: i32,
        payload: Vec<u8>,
    ) -> Result<(), CaptureError> {
        let result = CaptureAuthorization::from_result(result_code, payload);
        self.with_session(|session| session.on_authorization_result(result))
    }

    /// Platform notification that the projection was stopped underneath us.
    pub fn on_authorization_revoked(&self) -> Result<(), CaptureError> {
        self.with_session(|session| session.handle_revocation())
    }

    /// Start mirroring into `sink`, asking for consent first if no grant is cached.
    pub fn start_stream(&self, sink: SinkDescriptor) -> Result<(), CaptureError> {
        if !self.is_screen_mode_active() {
            log::info!("Screen mode inactive, not starting stream");
            return Err(CaptureError::ScreenModeInactive);
        }
        self.with_session(|session| session.start(None, sink))
    }

    pub fn update_stream(&self, sink: SinkDescriptor) -> Result<(), CaptureError> {
        self.with_session(|session| session.update_sink(sink))
    }

    pub fn stop_stream(&self) -> Result<(), CaptureError> {
        self.with_session(|session| {
            session.stop();
            Ok(())
        })
    }

    /// Stop streaming and forget the cached authorization.
    pub fn release_all(&self) -> Result<(), CaptureError> {
        self.with_session(|session| {
            session.release_all();
            Ok(())
        })
    }

    // --- Status ---

    pub fn is_streaming(&self) -> bool {
        self.session.lock().as_ref().is_some_and(SessionManager::is_streaming)
    }

    pub fn has_authorization(&self) -> bool {
        self.session.lock().as_ref().is_some_and(SessionManager::has_authorization)
    }

    /// Snapshot of the session, or `None` before `init`.
    pub fn status(&self) -> Option<StreamStatus> {
        self.session.lock().as_ref().map(SessionManager::status)
    }

    // --- Audio ---

    pub fn feed_system_audio(&self, data: &[u8], length: usize) {
        if let Some(mixer) = self.mixer() {
            mixer.feed_system_audio(data, length);
        }
    }

    pub fn feed_mic_audio(&self, data: &[u8], length: usize) {
        if let Some(mixer) = self.mixer() {
            mixer.feed_mic_audio(data, length);
        }
    }

    pub fn poll_mixed_audio(&self) -> Option<AudioFrame> {
        if self.is_shut_down() {
            return None;
        }
        self.mixer.get()?.poll_mixed_audio()
    }

    /// Number of mixed frames waiting to be polled.
    pub fn pending_mixed_audio(&self) -> usize {
        self.mixer.get().map_or(0, |mixer| mixer.pending_output())
    }

    pub fn set_system_volume(&self, volume: f32) {
        if let Some(mixer) = self.mixer() {
            mixer.set_system_volume(volume);
        }
    }

    pub fn set_mic_volume(&self, volume: f32) {
        if let Some(mixer) = self.mixer() {
            mixer.set_mic_volume(volume);
        }
    }

    pub fn mixer_diagnostics(&self) -> MixerDiagnostics {
        self.mixer.get().map(|mixer| mixer.diagnostics()).unwrap_or_default()
    }

    /// Wire capture sources into the mixer and start them.
    ///
    /// Unavailable sources are skipped, so mic-only capture is valid. Returns
    /// how many sources were started.
    pub fn start_audio_capture(
        &self,
        system: Option<Box<dyn PcmSource>>,
        mic: Option<Box<dyn PcmSource>>,
    ) -> Result<usize, CaptureError> {
        self.ensure_active()?;
        let mixer = self.mixer_or_err()?;
        let mut sources = self.audio_sources.lock();
        let mut started = 0;

        for (source, is_mic) in [(system, false), (mic, true)] {
            let Some(mut source) = source else {
                continue;
            };
            if !source.is_available() {
                log::info!("{:?} audio source unavailable, skipping", source.kind());
                continue;
            }

            source.start(self.feed_callback(&mixer, is_mic))?;
            log::info!("{:?} audio capture started", source.kind());
            sources.push(source);
            started += 1;
        }
        Ok(started)
    }

    /// Stop every running capture source. The mixer keeps running.
    pub fn stop_audio_capture(&self) {
        let sources: Vec<_> = self.audio_sources.lock().drain(..).collect();
        for mut source in sources {
            let kind = source.kind();
            match source.stop() {
                Ok(()) => log::info!("{:?} audio capture stopped", kind),
                Err(e) => log::warn!("Failed to stop {:?} audio capture: {}", kind, e),
            }
        }
    }

    // --- Lifecycle ---

    /// Tear everything down. Runs once; later calls return immediately.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("Shutting down stream context");

        self.stop_audio_capture();
        // Waits out a mixer initialization already in progress; an empty cell
        // stays empty because initializers re-check the shutdown flag.
        if let Ok(mixer) = self.mixer.get_or_try_init(|| Err(CaptureError::Released)) {
            mixer.stop();
        }

        let events = {
            let mut session = self.session.lock();
            match session.as_mut() {
                Some(session) => {
                    session.shutdown();
                    session.take_events()
                }
                None => Vec::new(),
            }
        };
        self.dispatch(events);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    // --- Internal helpers ---

    fn ensure_active(&self) -> Result<(), CaptureError> {
        if self.is_shut_down() {
            return Err(CaptureError::Released);
        }
        Ok(())
    }

    /// Run one transition under the lock, then deliver its events and any
    /// queued consent request unlocked.
    fn with_session<R>(
        &self,
        transition: impl FnOnce(&mut SessionManager) -> Result<R, CaptureError>,
    ) -> Result<R, CaptureError> {
        self.ensure_active()?;
        let (result, events, request) = {
            let mut guard = self.session.lock();
            let session = guard.as_mut().ok_or(CaptureError::NotInitialized)?;
            let result = transition(session);
            (result, session.take_events(), session.take_authorization_request())
        };
        self.dispatch(events);
        if request {
            self.send_authorization_request();
        }
        result
    }

    fn send_authorization_request(&self) {
        let requester = self.requester.read().clone();
        match requester {
            Some(requester) => requester.request_authorization(),
            None => log::warn!("No authorization requester registered"),
        }
    }

    fn dispatch(&self, events: Vec<CaptureEvent>) {
        if events.is_empty() {
            return;
        }
        let Some(delegate) = self.delegate.read().clone() else {
            return;
        };
        for event in &events {
            match event {
                CaptureEvent::Started => delegate.on_capture_started(),
                CaptureEvent::Stopped => delegate.on_capture_stopped(),
                CaptureEvent::Error(e) => delegate.on_capture_error(e),
            }
        }
    }

    fn mixer_or_err(&self) -> Result<Arc<MixerEngine>, CaptureError> {
        let mixer = self.mixer.get_or_try_init(|| {
            self.ensure_active()?;
            let mixer = Arc::new(MixerEngine::new(&self.config));
            mixer.start()?;
            Ok::<_, CaptureError>(mixer)
        })?;
        Ok(Arc::clone(mixer))
    }

    /// The running mixer, created on first use. `None` after shutdown.
    fn mixer(&self) -> Option<Arc<MixerEngine>> {
        if self.is_shut_down() {
            return None;
        }
        match self.mixer_or_err() {
            Ok(mixer) => Some(mixer),
            Err(CaptureError::Released) => None,
            Err(e) => {
                log::error!("Audio mixer unavailable: {}", e);
                None
            }
        }
    }

    fn feed_callback(&self, mixer: &Arc<MixerEngine>, is_mic: bool) -> PcmBufferCallback {
        let mixer = Arc::clone(mixer);
        let shut_down = Arc::clone(&self.shut_down);
        Arc::new(move |data: &[u8]| {
            if shut_down.load(Ordering::Relaxed) {
                return;
            }
            if is_mic {
                mixer.feed_mic_audio(data, data.len());
            } else {
                mixer.feed_system_audio(data, data.len());
            }
        })
    }
}

impl Drop for StreamContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
