use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioFrame, AudioSourceKind, MixerDiagnostics};
use crate::models::config::StreamConfiguration;
use crate::models::error::CaptureError;
use crate::processing::bounded_queue::BoundedQueue;
use crate::processing::pcm;

/// Result of a single mixing cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Both input queues were empty.
    Idle,
    /// A frame was published to the output queue.
    Mixed,
    /// The cycle's input was unusable and was dropped.
    Skipped(CaptureError),
}

/// Mix whatever each source delivered this cycle into one stereo frame.
///
/// A lone source passes through scaled by its own volume; two sources are
/// summed sample by sample with hard clipping.
pub fn mix_frames(
    system: Option<AudioFrame>,
    system_volume: f32,
    mic: Option<AudioFrame>,
    mic_volume: f32,
) -> Result<AudioFrame, CaptureError> {
    match (system, mic) {
        (Some(system), Some(mic)) => {
            pcm::ensure_mixable(&system)?;
            pcm::ensure_mixable(&mic)?;
            let mixed = pcm::mix_stereo(system.bytes(), system_volume, mic.bytes(), mic_volume);
            Ok(AudioFrame::stereo(mixed))
        }
        (Some(system), None) => {
            pcm::ensure_mixable(&system)?;
            Ok(pcm::apply_volume(system, system_volume))
        }
        (None, Some(mic)) => {
            pcm::ensure_mixable(&mic)?;
            Ok(pcm::apply_volume(mic, mic_volume))
        }
        (None, None) => Err(CaptureError::InvalidFrame("no input this cycle".into())),
    }
}

/// State shared between the engine handle, its worker thread, and feeders.
struct MixerShared {
    system_queue: BoundedQueue<AudioFrame>,
    mic_queue: BoundedQueue<AudioFrame>,
    output_queue: BoundedQueue<AudioFrame>,
    system_volume: AtomicU32,
    mic_volume: AtomicU32,
    running: AtomicBool,
    idle_backoff: Duration,
    diagnostics: Mutex<MixerDiagnostics>,
}

impl MixerShared {
    fn volume(&self, kind: AudioSourceKind) -> f32 {
        let bits = match kind {
            AudioSourceKind::System => self.system_volume.load(Ordering::Relaxed),
            AudioSourceKind::Mic => self.mic_volume.load(Ordering::Relaxed),
        };
        f32::from_bits(bits)
    }

    fn cycle(&self) -> CycleOutcome {
        let system = self.system_queue.poll();
        let mic = self.mic_queue.poll();
        if system.is_none() && mic.is_none() {
            return CycleOutcome::Idle;
        }

        self.diagnostics.lock().mix_cycles += 1;

        let system_volume = self.volume(AudioSourceKind::System);
        let mic_volume = self.volume(AudioSourceKind::Mic);
        match mix_frames(system, system_volume, mic, mic_volume) {
            Ok(mixed) => {
                let evicted = self.output_queue.push(mixed);
                let mut d = self.diagnostics.lock();
                d.frames_out += 1;
                d.frames_evicted += evicted as u64;
                CycleOutcome::Mixed
            }
            Err(e) => {
                self.diagnostics.lock().cycle_errors += 1;
                CycleOutcome::Skipped(e)
            }
        }
    }
}

/// Real-time mixer merging system playback audio and microphone audio.
///
/// Data flow:
/// ```text
/// feed_system_audio → [system queue] ─┐
///                                     ├→ worker: mix_frames → [output queue] → poll_mixed_audio
/// feed_mic_audio → mono→stereo → [mic queue] ─┘
/// ```
///
/// Every queue is bounded and drops its oldest frame when full. The worker
/// sleeps only when both inputs are empty.
pub struct MixerEngine {
    shared: Arc<MixerShared>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl MixerEngine {
    pub fn new(config: &StreamConfiguration) -> Self {
        let queue = || BoundedQueue::new(config.queue_capacity, config.eviction_threshold);
        Self {
            shared: Arc::new(MixerShared {
                system_queue: queue(),
                mic_queue: queue(),
                output_queue: queue(),
                system_volume: AtomicU32::new(pcm::clamp_volume(config.system_volume).to_bits()),
                mic_volume: AtomicU32::new(pcm::clamp_volume(config.mic_volume).to_bits()),
                running: AtomicBool::new(false),
                idle_backoff: config.idle_backoff(),
                diagnostics: Mutex::new(MixerDiagnostics::default()),
            }),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the mixing worker. Starting a running engine is a no-op.
    pub fn start(&self) -> Result<(), CaptureError> {
        let mut worker = self.worker.lock();
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("audio-mixer".into())
            .spawn(move || {
                while shared.running.load(Ordering::SeqCst) {
                    match shared.cycle() {
                        CycleOutcome::Mixed => {}
                        CycleOutcome::Idle => thread::sleep(shared.idle_backoff),
                        CycleOutcome::Skipped(e) => log::warn!("Mix cycle skipped: {}", e),
                    }
                }
            });

        match handle {
            Ok(handle) => {
                *worker = Some(handle);
                log::info!("Audio mixer started");
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                Err(CaptureError::Unknown(format!("failed to spawn mixer thread: {}", e)))
            }
        }
    }

    /// Stop the worker within one cycle and drop all queued audio.
    pub fn stop(&self) {
        let mut worker = self.worker.lock();
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = worker.take() {
            if handle.join().is_err() {
                log::error!("Audio mixer thread panicked");
            }
            log::info!("Audio mixer stopped");
        }

        self.shared.system_queue.clear();
        self.shared.mic_queue.clear();
        self.shared.output_queue.clear();
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Queue a system audio buffer (interleaved stereo).
    ///
    /// Only the first `length` bytes are used; an empty buffer is ignored.
    pub fn feed_system_audio(&self, data: &[u8], length: usize) {
        let bytes = &data[..length.min(data.len())];
        if bytes.is_empty() {
            return;
        }

        let evicted = self.shared.system_queue.push(AudioFrame::stereo(bytes.to_vec()));
        let mut d = self.shared.diagnostics.lock();
        d.system_frames_in += 1;
        d.frames_evicted += evicted as u64;
    }

    /// Queue a microphone buffer (mono), converted to interleaved stereo.
    pub fn feed_mic_audio(&self, data: &[u8], length: usize) {
        let stereo = pcm::mono_to_stereo(&data[..length.min(data.len())]);
        if stereo.is_empty() {
            return;
        }

        let evicted = self.shared.mic_queue.push(AudioFrame::stereo(stereo));
        let mut d = self.shared.diagnostics.lock();
        d.mic_frames_in += 1;
        d.frames_evicted += evicted as u64;
    }

    /// Take the oldest mixed frame, if any.
    pub fn poll_mixed_audio(&self) -> Option<AudioFrame> {
        self.shared.output_queue.poll()
    }

    pub fn set_system_volume(&self, volume: f32) {
        let volume = pcm::clamp_volume(volume);
        self.shared.system_volume.store(volume.to_bits(), Ordering::Relaxed);
        log::debug!("System volume set to {:.2}", volume);
    }

    pub fn set_mic_volume(&self, volume: f32) {
        let volume = pcm::clamp_volume(volume);
        self.shared.mic_volume.store(volume.to_bits(), Ordering::Relaxed);
        log::debug!("Mic volume set to {:.2}", volume);
    }

    pub fn system_volume(&self) -> f32 {
        self.shared.volume(AudioSourceKind::System)
    }

    pub fn mic_volume(&self) -> f32 {
        self.shared.volume(AudioSourceKind::Mic)
    }

    /// Run one mixing cycle on the calling thread.
    pub fn process_once(&self) -> CycleOutcome {
        self.shared.cycle()
    }

    /// Number of mixed frames waiting to be polled.
    pub fn pending_output(&self) -> usize {
        self.shared.output_queue.len()
    }

    pub fn output_capacity(&self) -> usize {
        self.shared.output_queue.capacity()
    }

    pub fn diagnostics(&self) -> MixerDiagnostics {
        self.shared.diagnostics.lock().clone()
    }
}

impl Drop for MixerEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
