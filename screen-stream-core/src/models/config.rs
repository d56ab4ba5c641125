use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Process-wide PCM sample rate shared by every audio source.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Hard capacity of each audio queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 50;

/// Queues evict their oldest entries while holding this many frames.
///
/// Applied identically to the system, mic and mixed-output queues so every
/// queue keeps the same headroom below its hard capacity.
pub const DEFAULT_EVICTION_THRESHOLD: usize = 40;

/// Mixer sleep when neither input queue has data.
pub const DEFAULT_IDLE_BACKOFF_MS: u64 = 10;

/// Configuration for a stream context and its mixer engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfiguration {
    /// PCM sample rate in Hz (default: 44100). No resampling is performed.
    pub sample_rate: u32,

    /// Hard capacity of each audio queue (default: 50).
    pub queue_capacity: usize,

    /// Soft limit that triggers drop-oldest eviction (default: 40).
    pub eviction_threshold: usize,

    /// Mixer idle backoff in milliseconds (default: 10).
    pub idle_backoff_ms: u64,

    /// Initial system audio volume, clamped to [0, 1].
    pub system_volume: f32,

    /// Initial microphone volume, clamped to [0, 1].
    pub mic_volume: f32,

    /// Name handed to the platform for every virtual output.
    pub virtual_output_name: String,
}

impl StreamConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.queue_capacity == 0 {
            return Err("queue capacity must be positive".into());
        }
        if self.eviction_threshold == 0 || self.eviction_threshold > self.queue_capacity {
            return Err(format!(
                "eviction threshold {} must be within 1..={}",
                self.eviction_threshold, self.queue_capacity
            ));
        }
        if self.idle_backoff_ms == 0 {
            return Err("idle backoff must be positive".into());
        }
        if !self.system_volume.is_finite() || !self.mic_volume.is_finite() {
            return Err("volumes must be finite".into());
        }
        Ok(())
    }

    /// Parse a JSON configuration document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, CaptureError> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("invalid configuration: {}", e))
        })?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

impl Default for StreamConfiguration {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            eviction_threshold: DEFAULT_EVICTION_THRESHOLD,
            idle_backoff_ms: DEFAULT_IDLE_BACKOFF_MS,
            system_volume: 1.0,
            mic_volume: 1.0,
            virtual_output_name: "ScreenStream".into(),
        }
    }
}
