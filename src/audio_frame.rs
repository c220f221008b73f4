//! The planar audio block produced by the NDI receiver.

/// One block of planar float32 audio as delivered by NDI capture.
///
/// Storage mirrors the NDI SDK's own layout: channels are stored back to
/// back, each occupying `channel_stride` samples (which may exceed
/// `samples_per_channel` when the SDK pads channel strides).
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub sample_rate: u32,
    pub channel_count: u16,
    pub samples_per_channel: usize,
    channel_stride: usize,
    planes: Vec<f32>,
}

impl AudioFrame {
    /// Build a frame from a planar buffer. `planes.len()` must be at least
    /// `channel_stride * channel_count`.
    pub fn from_planar(
        sample_rate: u32,
        channel_count: u16,
        samples_per_channel: usize,
        channel_stride: usize,
        planes: Vec<f32>,
    ) -> Self {
        debug_assert!(planes.len() >= channel_stride * channel_count as usize);
        Self {
            sample_rate,
            channel_count,
            samples_per_channel,
            channel_stride,
            planes,
        }
    }

    /// Convenience constructor for tightly-packed planar data (`channel_stride == samples_per_channel`).
    pub fn from_channels(sample_rate: u32, samples_per_channel: usize, channels: &[&[f32]]) -> Self {
        let mut planes = Vec::with_capacity(samples_per_channel * channels.len());
        for ch in channels {
            planes.extend_from_slice(&ch[..samples_per_channel]);
        }
        Self::from_planar(
            sample_rate,
            channels.len() as u16,
            samples_per_channel,
            samples_per_channel,
            planes,
        )
    }

    /// Samples for channel `idx` (0-based). Panics if `idx >= channel_count`.
    pub fn channel(&self, idx: usize) -> &[f32] {
        let start = idx * self.channel_stride;
        &self.planes[start..start + self.samples_per_channel]
    }

    pub fn is_supported_format(&self) -> bool {
        self.sample_rate == crate::config::AES67_SAMPLE_RATE && self.channel_count >= 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_slicing_respects_stride() {
        let l = [1.0f32, 2.0, 3.0];
        let r = [4.0f32, 5.0, 6.0];
        let frame = AudioFrame::from_channels(48_000, 3, &[&l, &r]);
        assert_eq!(frame.channel(0), &[1.0, 2.0, 3.0]);
        assert_eq!(frame.channel(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn rejects_wrong_sample_rate_and_mono() {
        let l = [0.0f32; 4];
        let frame = AudioFrame::from_channels(44_100, 4, &[&l, &l]);
        assert!(!frame.is_supported_format());
        let mono = AudioFrame::from_channels(48_000, 4, &[&l]);
        assert!(!mono.is_supported_format());
    }
}
