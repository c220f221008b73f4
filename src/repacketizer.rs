//! Converts variable-size planar float32 frames into fixed-size interleaved
//! 24-bit-big-endian packets of exactly `samples_per_packet` samples per
//! channel.
//!
//! Pure and synchronous: no sockets, no NDI, no async. Unit-testable in
//! isolation, the way `bass-rtp::rtp::header` is kept separate from
//! `bass-rtp::rtp::socket`.

use crate::audio_frame::AudioFrame;

/// Full-scale int32 conversion factor, per spec: `clip(x * i32::MAX, i32::MIN, i32::MAX)`.
const FULL_SCALE: f32 = i32::MAX as f32;

/// A fixed-size interleaved stereo int24-BE payload, ready to append after an
/// RTP header.
pub type PacketPayload = Vec<u8>;

pub struct Repacketizer {
    samples_per_packet: usize,
    /// Pending interleaved int32 samples not yet flushed: `[L0, R0, L1, R1, ...]`.
    carry: Vec<i32>,
}

impl Repacketizer {
    pub fn new(samples_per_packet: usize) -> Self {
        Self {
            samples_per_packet,
            carry: Vec::with_capacity(samples_per_packet * 2 * 2),
        }
    }

    /// Number of stereo sample-pairs currently buffered (not yet a full packet).
    pub fn carry_len(&self) -> usize {
        self.carry.len() / 2
    }

    /// Feed one frame; returns zero or more fixed-size packet payloads.
    ///
    /// Drops the frame (no payloads) if it isn't a supported format; callers
    /// are expected to have already checked `AudioFrame::is_supported_format`,
    /// but this is defensive since the repacketizer is reusable standalone.
    pub fn push_frame(&mut self, frame: &AudioFrame) -> Vec<PacketPayload> {
        if !frame.is_supported_format() {
            return Vec::new();
        }

        let left = frame.channel(0);
        let right = frame.channel(1);
        self.carry.reserve(left.len() * 2);
        for i in 0..frame.samples_per_channel {
            self.carry.push(to_i32(left[i]));
            self.carry.push(to_i32(right[i]));
        }

        self.drain_packets()
    }

    fn drain_packets(&mut self) -> Vec<PacketPayload> {
        let mut packets = Vec::new();
        let frame_samples = self.samples_per_packet * 2;
        while self.carry.len() >= frame_samples {
            let chunk = &self.carry[..frame_samples];
            packets.push(pack_l24(chunk));
            self.carry.drain(..frame_samples);
        }
        packets
    }
}

fn to_i32(x: f32) -> i32 {
    (x * FULL_SCALE).clamp(i32::MIN as f32, i32::MAX as f32) as i32
}

/// Pack interleaved int32 samples into signed 24-bit big-endian triplets,
/// keeping the high 24 bits of each sample (arithmetic shift right by 8).
fn pack_l24(interleaved: &[i32]) -> PacketPayload {
    let mut out = Vec::with_capacity(interleaved.len() * 3);
    for &sample in interleaved {
        let s24 = sample >> 8;
        out.push(((s24 >> 16) & 0xFF) as u8);
        out.push(((s24 >> 8) & 0xFF) as u8);
        out.push((s24 & 0xFF) as u8);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silent_frame(samples: usize) -> AudioFrame {
        let zeros = vec![0.0f32; samples];
        AudioFrame::from_channels(48_000, samples, &[&zeros, &zeros])
    }

    #[test]
    fn float_to_int24_boundaries() {
        // Property 4: +1.0 -> 0x7FFFFF, -1.0 -> 0x800000, 0.0 -> 0x000000, +1.5 clips to 0x7FFFFF
        assert_eq!(pack_l24(&[to_i32(1.0), to_i32(1.0)]), vec![0x7F, 0xFF, 0xFF, 0x7F, 0xFF, 0xFF]);
        assert_eq!(pack_l24(&[to_i32(-1.0)]), vec![0x80, 0x00, 0x00]);
        assert_eq!(pack_l24(&[to_i32(0.0)]), vec![0x00, 0x00, 0x00]);
        assert_eq!(pack_l24(&[to_i32(1.5)]), vec![0x7F, 0xFF, 0xFF]);
    }

    #[test]
    fn silent_stream_emits_expected_packet_count_and_payload() {
        // Scenario 1: 10 frames of 480 samples -> 100 packets of 48 samples each.
        let mut rp = Repacketizer::new(48);
        let mut total_packets = 0;
        for _ in 0..10 {
            let frame = silent_frame(480);
            let packets = rp.push_frame(&frame);
            for pkt in &packets {
                assert_eq!(pkt.len(), 48 * 2 * 3);
                assert!(pkt.iter().all(|&b| b == 0));
            }
            total_packets += packets.len();
        }
        assert_eq!(total_packets, 100);
        assert_eq!(rp.carry_len(), 0);
    }

    #[test]
    fn carry_arithmetic_across_frames() {
        // Scenario 2: 50 samples -> 1 packet, carry 2; then 46 samples -> 1 packet, carry 0.
        let mut rp = Repacketizer::new(48);
        let first = rp.push_frame(&silent_frame(50));
        assert_eq!(first.len(), 1);
        assert_eq!(rp.carry_len(), 2);

        let second = rp.push_frame(&silent_frame(46));
        assert_eq!(second.len(), 1);
        assert_eq!(rp.carry_len(), 0);
    }

    #[test]
    fn full_scale_opposite_polarity_payload() {
        // Scenario 3: L=+1.0, R=-1.0 for 48 samples.
        let left = vec![1.0f32; 48];
        let right = vec![-1.0f32; 48];
        let frame = AudioFrame::from_channels(48_000, 48, &[&left, &right]);
        let mut rp = Repacketizer::new(48);
        let packets = rp.push_frame(&frame);
        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0][0..6], &[0x7F, 0xFF, 0xFF, 0x80, 0x00, 0x00]);
    }

    #[test]
    fn bad_sample_rate_is_dropped_silently() {
        // Scenario 6: 44.1kHz frame produces zero packets, no panic.
        let zeros = vec![0.0f32; 48];
        let frame = AudioFrame::from_channels(44_100, 48, &[&zeros, &zeros]);
        let mut rp = Repacketizer::new(48);
        assert!(rp.push_frame(&frame).is_empty());
        assert_eq!(rp.carry_len(), 0);
    }

    #[test]
    fn sample_conservation_property() {
        // Property 3: total samples in == packets*samples_per_packet + carry_out.
        let mut rp = Repacketizer::new(48);
        let mut fed = 0usize;
        for n in [17, 31, 100, 5, 48, 200] {
            fed += n;
            rp.push_frame(&silent_frame(n));
        }
        let produced = fed / 48;
        let carry = fed % 48;
        // Re-derive by replaying since push_frame doesn't return a running total here.
        let mut rp2 = Repacketizer::new(48);
        let mut total_packets = 0;
        for n in [17, 31, 100, 5, 48, 200] {
            total_packets += rp2.push_frame(&silent_frame(n)).len();
        }
        assert_eq!(total_packets, produced);
        assert_eq!(rp2.carry_len(), carry);
    }
}
