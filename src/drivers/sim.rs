use std::collections::VecDeque;
use std::f32::consts::PI;
use std::time::{Duration, Instant};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::drivers::codec;
use crate::drivers::sample::Vec3;
use crate::drivers::source::{ChunkSource, TransportEvent};
use crate::drivers::LinkError;
/// Firmware report period (50 Hz).
const REPORT_PERIOD_MS: u32 = 20;
const SWING_EVERY: u32 = 150;
const SWING_LEN: u32 = 25;
/// Stand-in for the racket: produces firmware frames and fragments them the
/// way a small-MTU link would.
pub struct SimulatedRacket {
    rng: StdRng,
    pending: VecDeque<u8>,
    sequence: u32,
    timestamp_ms: u32,
    chunk_len: (usize, usize),
    ten_bit_ratio: f64,
    usb_glitch_ratio: f64,
    period: Option<Duration>,
    next_due: Instant,
}
impl SimulatedRacket {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let timestamp_ms = rng.gen_range(0..1_000_000);
        Self {
            rng,
            pending: VecDeque::new(),
            sequence: 0,
            timestamp_ms,
            chunk_len: (8, 20),
            ten_bit_ratio: 0.3,
            usb_glitch_ratio: 0.01,
            period: None,
            next_due: Instant::now(),
        }
    }
    /// Payload sizes are drawn uniformly from `min..=max`.
    pub fn with_chunk_len(mut self, min: usize, max: usize) -> Self {
        let min = min.max(1);
        self.chunk_len = (min, max.max(min));
        self
    }
    pub fn with_usb_glitches(mut self, ratio: f64) -> Self {
        self.usb_glitch_ratio = ratio.clamp(0.0, 1.0);
        self
    }
    /// Releases one report per firmware period instead of as fast as polled.
    pub fn paced(mut self) -> Self {
        self.period = Some(Duration::from_millis(REPORT_PERIOD_MS as u64));
        self
    }
    pub fn frames_generated(&self) -> u32 {
        self.sequence
    }
    fn generate_frame(&mut self) {
        let n = self.sequence;
        let phase = n % SWING_EVERY;
        let (mut accel, mut gyro) = (
            Vec3::new(0.02, -0.01, 1.0),
            Vec3::new(0.8, -0.5, 0.3),
        );
        if n >= SWING_EVERY && phase < SWING_LEN {
            let pulse = (PI * phase as f32 / SWING_LEN as f32).sin();
            accel.y += 12.0 * pulse;
            accel.z -= 3.0 * pulse;
            gyro.x += 1800.0 * pulse;
        }
        let accel = Vec3::new(
            accel.x + self.noise(0.01),
            accel.y + self.noise(0.01),
            accel.z + self.noise(0.01),
        );
        let gyro = Vec3::new(
            gyro.x + self.noise(0.2),
            gyro.y + self.noise(0.2),
            gyro.z + self.noise(0.2),
        );
        let voltage_raw = self.voltage_code();
        let frame = codec::encode(self.timestamp_ms, accel, gyro, voltage_raw);
        self.pending.extend(frame.as_bytes().iter().copied());
        self.sequence += 1;
        self.timestamp_ms = self.timestamp_ms.wrapping_add(REPORT_PERIOD_MS);
    }
    fn voltage_code(&mut self) -> u16 {
        if self.rng.gen_bool(self.usb_glitch_ratio) {
            return 4095;
        }
        // about 4.05 V either way
        if self.rng.gen_bool(self.ten_bit_ratio) {
            self.rng.gen_range(509..=513)
        } else {
            self.rng.gen_range(2036..=2052)
        }
    }
    fn noise(&mut self, amplitude: f32) -> f32 {
        self.rng.gen_range(-amplitude..=amplitude)
    }
}
impl ChunkSource for SimulatedRacket {
    fn next_event(&mut self) -> Result<Option<TransportEvent>, LinkError> {
        if self.pending.is_empty() {
            if let Some(period) = self.period {
                let now = Instant::now();
                if now < self.next_due {
                    return Ok(None);
                }
                self.next_due = now + period;
            }
            self.generate_frame();
        }
        let (min, max) = self.chunk_len;
        let len = self.rng.gen_range(min..=max).min(self.pending.len());
        Ok(Some(TransportEvent::Chunk(self.pending.drain(..len).collect())))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::reassembler::{FrameReassembler, FRAME_LEN};
    #[test]
    fn chunks_reassemble_into_generated_frames() {
        let mut sim = SimulatedRacket::new(3).with_chunk_len(1, 29);
        let mut reassembler = FrameReassembler::new();
        let mut frames = Vec::new();
        while frames.len() < 50 {
            if let Some(TransportEvent::Chunk(chunk)) = sim.next_event().unwrap() {
                assert!(chunk.len() < FRAME_LEN);
                frames.extend(reassembler.accept(&chunk));
            }
        }
        assert!(sim.frames_generated() >= 50);
        let first = codec::decode(&frames[0], Instant::now());
        let second = codec::decode(&frames[1], Instant::now());
        assert_eq!(second.timestamp_ms, first.timestamp_ms.wrapping_add(REPORT_PERIOD_MS));
        assert!((first.accel.z - 1.0).abs() < 0.05);
    }
    #[test]
    fn same_seed_same_stream() {
        let mut a = SimulatedRacket::new(11);
        let mut b = SimulatedRacket::new(11);
        for _ in 0..20 {
            assert_eq!(a.next_event().unwrap(), b.next_event().unwrap());
        }
    }
}
