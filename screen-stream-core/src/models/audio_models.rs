use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bytes per 16-bit PCM sample.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Which capture source produced a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioSourceKind {
    /// Playback audio captured from the system mix (interleaved stereo).
    System,
    /// Microphone audio (mono).
    Mic,
}

/// Channel layout of an interleaved PCM buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn channels(&self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// An immutable buffer of interleaved 16-bit little-endian PCM samples.
///
/// The buffer is never mutated after creation; volume scaling and channel
/// conversion produce new frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    data: Vec<u8>,
    layout: ChannelLayout,
}

impl AudioFrame {
    pub fn new(data: Vec<u8>, layout: ChannelLayout) -> Self {
        Self { data, layout }
    }

    pub fn stereo(data: Vec<u8>) -> Self {
        Self::new(data, ChannelLayout::Stereo)
    }

    pub fn mono(data: Vec<u8>) -> Self {
        Self::new(data, ChannelLayout::Mono)
    }

    /// Build a frame from 16-bit samples.
    pub fn from_samples(samples: &[i16], layout: ChannelLayout) -> Self {
        let mut data = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
        for sample in samples {
            data.extend_from_slice(&sample.to_le_bytes());
        }
        Self::new(data, layout)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of complete 16-bit samples across all channels.
    pub fn sample_count(&self) -> usize {
        self.data.len() / BYTES_PER_SAMPLE
    }

    /// Whether the buffer holds only complete samples.
    pub fn is_aligned(&self) -> bool {
        self.data.len() % BYTES_PER_SAMPLE == 0
    }

    /// Decoded samples, ignoring a trailing partial sample.
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.data
            .chunks_exact(BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }

    /// Playback duration at the given sample rate.
    pub fn duration(&self, sample_rate: u32) -> Duration {
        if sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = (self.sample_count() / self.layout.channels()) as u64;
        Duration::from_nanos(frames * 1_000_000_000 / sample_rate as u64)
    }
}

/// Counters for debugging the mixer pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MixerDiagnostics {
    pub system_frames_in: u64,
    pub mic_frames_in: u64,
    pub mix_cycles: u64,
    pub frames_out: u64,
    pub frames_evicted: u64,
    pub cycle_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_samples_is_little_endian() {
        let frame = AudioFrame::from_samples(&[1, -2], ChannelLayout::Stereo);
        assert_eq!(frame.bytes(), &[0x01, 0x00, 0xFE, 0xFF]);
        assert_eq!(frame.samples().collect::<Vec<_>>(), vec![1, -2]);
    }

    #[test]
    fn trailing_byte_is_not_a_sample() {
        let frame = AudioFrame::stereo(vec![0x10, 0x00, 0x7F]);
        assert!(!frame.is_aligned());
        assert_eq!(frame.sample_count(), 1);
        assert_eq!(frame.samples().collect::<Vec<_>>(), vec![16]);
    }

    #[test]
    fn duration_counts_frames_not_samples() {
        // 4410 stereo frames at 44.1 kHz = 100 ms
        let frame = AudioFrame::stereo(vec![0; 4410 * 2 * BYTES_PER_SAMPLE]);
        assert_eq!(frame.duration(44_100), Duration::from_millis(100));

        let mono = AudioFrame::mono(vec![0; 4410 * BYTES_PER_SAMPLE]);
        assert_eq!(mono.duration(44_100), Duration::from_millis(100));
        assert_eq!(mono.duration(0), Duration::ZERO);
    }
}
