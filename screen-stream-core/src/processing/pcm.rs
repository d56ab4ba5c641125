//! 16-bit PCM sample helpers.
//!
//! All buffers are interleaved little-endian `i16`. A trailing odd byte is
//! never treated as a sample.

use crate::models::audio_models::{AudioFrame, ChannelLayout, BYTES_PER_SAMPLE};
use crate::models::error::CaptureError;

/// Clamp a volume scalar to `[0.0, 1.0]`. NaN maps to silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0)
}

/// Scale one sample, truncating toward zero.
#[inline]
pub fn scale_sample(sample: i16, volume: f32) -> i16 {
    (sample as f32 * volume) as i16
}

/// Hard-clip a widened sum to the signed 16-bit range.
#[inline]
pub fn clamp_to_i16(sum: i32) -> i16 {
    sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Add two samples, saturating at the 16-bit boundaries instead of wrapping.
#[inline]
pub fn clipping_add(a: i16, b: i16) -> i16 {
    clamp_to_i16(a as i32 + b as i32)
}

#[inline]
fn read_sample(data: &[u8], index: usize) -> Option<i16> {
    let offset = index * BYTES_PER_SAMPLE;
    let bytes = data.get(offset..offset + BYTES_PER_SAMPLE)?;
    Some(i16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Duplicate each mono sample into both channel slots.
///
/// Output length is twice the length of the complete samples in `mono`.
pub fn mono_to_stereo(mono: &[u8]) -> Vec<u8> {
    let mut stereo = Vec::with_capacity(mono.len() / BYTES_PER_SAMPLE * BYTES_PER_SAMPLE * 2);
    for sample in mono.chunks_exact(BYTES_PER_SAMPLE) {
        stereo.extend_from_slice(sample);
        stereo.extend_from_slice(sample);
    }
    stereo
}

/// Return a frame scaled by `volume`.
///
/// A volume of exactly 1.0 returns the frame untouched.
pub fn apply_volume(frame: AudioFrame, volume: f32) -> AudioFrame {
    if volume == 1.0 {
        return frame;
    }

    let mut scaled = Vec::with_capacity(frame.len());
    for sample in frame.samples() {
        scaled.extend_from_slice(&scale_sample(sample, volume).to_le_bytes());
    }
    AudioFrame::new(scaled, frame.layout())
}

/// Mix two interleaved stereo buffers sample by sample.
///
/// Each source is scaled by its own volume before summing; the sum is hard
/// clipped to `[-32768, 32767]`. Output length is the longer of the two
/// inputs, and the tail past the shorter buffer is the surviving source alone.
pub fn mix_stereo(system: &[u8], system_volume: f32, mic: &[u8], mic_volume: f32) -> Vec<u8> {
    let sample_count = system.len().max(mic.len()) / BYTES_PER_SAMPLE;
    let mut mixed = Vec::with_capacity(sample_count * BYTES_PER_SAMPLE);

    for i in 0..sample_count {
        let system_sample = read_sample(system, i).map_or(0, |s| scale_sample(s, system_volume));
        let mic_sample = read_sample(mic, i).map_or(0, |s| scale_sample(s, mic_volume));
        mixed.extend_from_slice(&clipping_add(system_sample, mic_sample).to_le_bytes());
    }
    mixed
}

/// Check that a frame can enter the stereo mix.
pub fn ensure_mixable(frame: &AudioFrame) -> Result<(), CaptureError> {
    if frame.layout() != ChannelLayout::Stereo {
        return Err(CaptureError::InvalidFrame(format!(
            "expected stereo frame, got {:?}",
            frame.layout()
        )));
    }
    if !frame.is_aligned() {
        return Err(CaptureError::InvalidFrame(format!(
            "frame length {} is not a whole number of samples",
            frame.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_samples(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    fn to_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn clamp_volume_bounds() {
        assert_eq!(clamp_volume(1.5), 1.0);
        assert_eq!(clamp_volume(-0.2), 0.0);
        assert_eq!(clamp_volume(0.25), 0.25);
        assert_eq!(clamp_volume(f32::NAN), 0.0);
    }

    #[test]
    fn scale_truncates_toward_zero() {
        assert_eq!(scale_sample(101, 0.5), 50);
        assert_eq!(scale_sample(-101, 0.5), -50);
        assert_eq!(scale_sample(i16::MIN, 1.0), i16::MIN);
    }

    #[test]
    fn clipping_add_saturates() {
        assert_eq!(clipping_add(30_000, 10_000), i16::MAX);
        assert_eq!(clipping_add(-30_000, -10_000), i16::MIN);
        assert_eq!(clipping_add(100, -50), 50);
    }

    #[test]
    fn mono_to_stereo_duplicates_each_sample() {
        let mono = to_bytes(&[1, -2, 300]);
        let stereo = mono_to_stereo(&mono);

        assert_eq!(stereo.len(), mono.len() * 2);
        assert_eq!(to_samples(&stereo), vec![1, 1, -2, -2, 300, 300]);
    }

    #[test]
    fn mono_to_stereo_ignores_trailing_byte() {
        let mut mono = to_bytes(&[7]);
        mono.push(0xAA);
        assert_eq!(to_samples(&mono_to_stereo(&mono)), vec![7, 7]);
    }

    #[test]
    fn apply_volume_unity_is_identity() {
        let frame = AudioFrame::from_samples(&[1000, -1000], ChannelLayout::Stereo);
        assert_eq!(apply_volume(frame.clone(), 1.0), frame);
    }

    #[test]
    fn apply_volume_scales_and_keeps_layout() {
        let frame = AudioFrame::from_samples(&[1000, -1000, 3], ChannelLayout::Mono);
        let scaled = apply_volume(frame, 0.5);
        assert_eq!(scaled.layout(), ChannelLayout::Mono);
        assert_eq!(scaled.samples().collect::<Vec<_>>(), vec![500, -500, 1]);
    }

    #[test]
    fn mix_sums_scaled_samples() {
        let system = to_bytes(&[1000, 2000]);
        let mic = to_bytes(&[100, -100]);

        let mixed = mix_stereo(&system, 0.5, &mic, 1.0);
        assert_eq!(to_samples(&mixed), vec![600, 900]);
    }

    #[test]
    fn mix_hard_clips_instead_of_wrapping() {
        let system = to_bytes(&[30_000, -30_000]);
        let mic = to_bytes(&[20_000, -20_000]);

        let mixed = mix_stereo(&system, 1.0, &mic, 1.0);
        assert_eq!(to_samples(&mixed), vec![i16::MAX, i16::MIN]);
    }

    #[test]
    fn mix_tail_comes_from_longer_source_alone() {
        let system = to_bytes(&[10, 10]);
        let mic = to_bytes(&[4, 4, 8, 8]);

        let mixed = mix_stereo(&system, 1.0, &mic, 0.5);
        assert_eq!(mixed.len(), mic.len());
        assert_eq!(to_samples(&mixed), vec![12, 12, 4, 4]);
    }

    #[test]
    fn ensure_mixable_rejects_mono_and_partial_samples() {
        let mono = AudioFrame::mono(to_bytes(&[1, 2]));
        assert!(matches!(ensure_mixable(&mono), Err(CaptureError::InvalidFrame(_))));

        let partial = AudioFrame::stereo(vec![1, 2, 3]);
        assert!(matches!(ensure_mixable(&partial), Err(CaptureError::InvalidFrame(_))));

        assert!(ensure_mixable(&AudioFrame::stereo(to_bytes(&[1, 2]))).is_ok());
    }
}
