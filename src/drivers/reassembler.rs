use log::{debug, warn};
/// Size of one firmware report on the wire.
pub const FRAME_LEN: usize = 30;
/// One complete firmware report, ready for decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame([u8; FRAME_LEN]);
impl Frame {
    pub fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }
    /// Copies the first `FRAME_LEN` bytes of `data`, if there are that many.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let head = data.get(..FRAME_LEN)?;
        let mut bytes = [0u8; FRAME_LEN];
        bytes.copy_from_slice(head);
        Some(Self(bytes))
    }
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }
}
/// Counters kept for link diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    pub chunks: u64,
    pub fast_path_frames: u64,
    pub assembled_frames: u64,
    pub oversized_chunks: u64,
    pub overflow_resets: u64,
    pub disconnect_resets: u64,
    pub discarded_bytes: u64,
}
impl ReassemblyStats {
    pub fn frames(&self) -> u64 {
        self.fast_path_frames + self.assembled_frames + self.oversized_chunks
    }
}
/// Rebuilds fixed-size frames from notification payloads of any length.
pub struct FrameReassembler {
    bytes: [u8; FRAME_LEN],
    filled: usize,
    stats: ReassemblyStats,
}
impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new()
    }
}
impl FrameReassembler {
    pub fn new() -> Self {
        Self {
            bytes: [0u8; FRAME_LEN],
            filled: 0,
            stats: ReassemblyStats::default(),
        }
    }
    /// Bytes of the frame currently being assembled.
    pub fn pending(&self) -> usize {
        self.filled
    }
    pub fn stats(&self) -> ReassemblyStats {
        self.stats
    }
    /// Feeds one chunk and returns every frame it completed, in order.
    pub fn accept(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.stats.chunks += 1;
        if chunk.is_empty() {
            debug!("empty notification payload ignored");
            return Vec::new();
        }
        if chunk.len() == FRAME_LEN && self.filled == 0 {
            self.stats.fast_path_frames += 1;
            return Frame::from_slice(chunk).into_iter().collect();
        }
        if chunk.len() > FRAME_LEN {
            return self.accept_oversized(chunk);
        }
        self.accept_fragment(chunk)
    }
    /// Drops any partial frame. Must run before a new connection delivers data.
    pub fn reset(&mut self) {
        if self.filled > 0 {
            debug!("dropping {} buffered bytes on reset", self.filled);
            self.stats.discarded_bytes += self.filled as u64;
        }
        self.stats.disconnect_resets += 1;
        self.filled = 0;
    }
    fn accept_oversized(&mut self, chunk: &[u8]) -> Vec<Frame> {
        warn!(
            "oversized chunk: {} bytes, expected {}; keeping the first {}",
            chunk.len(),
            FRAME_LEN,
            FRAME_LEN
        );
        self.stats.oversized_chunks += 1;
        self.stats.discarded_bytes += (chunk.len() - FRAME_LEN + self.filled) as u64;
        self.filled = 0;
        Frame::from_slice(chunk).into_iter().collect()
    }
    fn accept_fragment(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut rest = chunk;
        while !rest.is_empty() {
            let take = rest.len().min(FRAME_LEN - self.filled);
            self.bytes[self.filled..self.filled + take].copy_from_slice(&rest[..take]);
            self.filled += take;
            rest = &rest[take..];
            debug!("fragment: {} bytes, buffer {}/{}", take, self.filled, FRAME_LEN);
            if self.filled == FRAME_LEN {
                frames.push(Frame(self.bytes));
                self.stats.assembled_frames += 1;
                self.filled = 0;
            } else if self.filled + rest.len() > FRAME_LEN {
                warn!("reassembly overflow, resetting buffer");
                self.stats.overflow_resets += 1;
                self.stats.discarded_bytes += (self.filled + rest.len()) as u64;
                self.filled = 0;
                break;
            }
        }
        frames
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    fn numbered_frames(count: usize) -> Vec<u8> {
        (0..count * FRAME_LEN).map(|i| (i % 251) as u8).collect()
    }
    #[test]
    fn exact_frame_takes_fast_path() {
        let mut r = FrameReassembler::new();
        let data = numbered_frames(1);
        let frames = r.accept(&data);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes()[..], data[..]);
        assert_eq!(r.pending(), 0);
        assert_eq!(r.stats().fast_path_frames, 1);
    }
    #[test]
    fn fragments_assemble_into_one_frame() {
        let mut r = FrameReassembler::new();
        let data = numbered_frames(1);
        assert!(r.accept(&data[..20]).is_empty());
        assert_eq!(r.pending(), 20);
        let frames = r.accept(&data[20..]);
        assert_eq!(frames, vec![Frame::from_slice(&data).unwrap()]);
        assert_eq!(r.pending(), 0);
    }
    #[test]
    fn tail_and_head_in_one_chunk() {
        let mut r = FrameReassembler::new();
        let data = numbered_frames(2);
        assert!(r.accept(&data[..25]).is_empty());
        // 5 bytes finish frame one, 20 start frame two
        let frames = r.accept(&data[25..50]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes()[..], data[..30]);
        assert_eq!(r.pending(), 20);
        let frames = r.accept(&data[50..]);
        assert_eq!(frames[0].as_bytes()[..], data[30..]);
    }
    #[test]
    fn misaligned_thirty_byte_chunk_is_not_fast_pathed() {
        let mut r = FrameReassembler::new();
        let data = numbered_frames(2);
        r.accept(&data[..10]);
        let frames = r.accept(&data[10..40]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes()[..], data[..30]);
        let frames = r.accept(&data[40..]);
        assert_eq!(frames[0].as_bytes()[..], data[30..]);
    }
    #[test]
    fn random_split_points_reproduce_frames() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let k = rng.gen_range(1..8);
            let data = numbered_frames(k);
            let mut r = FrameReassembler::new();
            let mut out = Vec::new();
            let mut pos = 0;
            while pos < data.len() {
                let len = rng.gen_range(1..=FRAME_LEN).min(data.len() - pos);
                out.extend(r.accept(&data[pos..pos + len]));
                pos += len;
            }
            assert_eq!(out.len(), k);
            for (i, frame) in out.iter().enumerate() {
                assert_eq!(frame.as_bytes()[..], data[i * FRAME_LEN..(i + 1) * FRAME_LEN]);
            }
            assert_eq!(r.pending(), 0);
        }
    }
    #[test]
    fn oversized_chunk_is_truncated() {
        let mut r = FrameReassembler::new();
        let data: Vec<u8> = (0..35).collect();
        let frames = r.accept(&data);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes()[..], data[..30]);
        assert_eq!(r.pending(), 0);
        // the five trailing bytes must not leak into the next frame
        let next = numbered_frames(1);
        let frames = r.accept(&next);
        assert_eq!(frames[0].as_bytes()[..], next[..]);
        assert_eq!(r.stats().oversized_chunks, 1);
        assert_eq!(r.stats().discarded_bytes, 5);
    }
    #[test]
    fn reset_drops_partial_frame() {
        let mut r = FrameReassembler::new();
        let data = numbered_frames(1);
        r.accept(&data[..12]);
        r.reset();
        assert_eq!(r.pending(), 0);
        let frames = r.accept(&data);
        assert_eq!(frames[0].as_bytes()[..], data[..]);
        assert_eq!(r.stats().discarded_bytes, 12);
    }
    #[test]
    fn empty_chunk_is_ignored() {
        let mut r = FrameReassembler::new();
        assert!(r.accept(&[]).is_empty());
        assert_eq!(r.pending(), 0);
    }
}
