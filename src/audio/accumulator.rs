//! # Audio Accumulator
//!
//! Buffers raw decoded audio bytes until enough has been collected for one
//! transcription pass, then hands the whole block off atomically.
//!
//! ## Locking Contract:
//! The accumulator itself is not synchronized. The session state machine
//! guards it with its own locks, and `drain()` in particular must only be
//! called while the session's transcription lock is held so two concurrent
//! passes can never race on the same bytes.

use byteorder::{ByteOrder, LittleEndian};

/// Append-only byte buffer with a drain threshold.
#[derive(Debug)]
pub struct AudioAccumulator {
    buffer: Vec<u8>,
    threshold_bytes: usize,
}

impl AudioAccumulator {
    /// Create an accumulator that reports ready at `threshold_bytes`.
    pub fn new(threshold_bytes: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(threshold_bytes),
            threshold_bytes,
        }
    }

    /// Append a decoded audio chunk. Chunks arriving while a transcription
    /// pass is in flight simply grow the buffer; they are picked up by the
    /// next drain.
    pub fn append(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Whether enough audio is buffered to justify a transcription pass.
    pub fn should_drain(&self) -> bool {
        self.buffer.len() >= self.threshold_bytes
    }

    /// Atomically take the buffered audio and leave the buffer empty.
    pub fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard everything without draining (session restart).
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Best-effort normalization of a decoded client chunk to raw PCM.
///
/// Browsers commonly wrap 16-bit PCM in a WAV container; when a RIFF/WAVE
/// header is present the audio payload is unwrapped from its `data` chunk.
/// Anything else is passed through untouched; the transcription collaborator
/// tolerates imperfect input better than a dropped chunk would.
pub fn normalize_chunk(data: &[u8]) -> Vec<u8> {
    if let Some(pcm) = strip_wav_container(data) {
        return pcm.to_vec();
    }
    data.to_vec()
}

/// Locate the `data` chunk payload inside a RIFF/WAVE container, if this is
/// one. Returns `None` for anything that doesn't parse as WAV.
fn strip_wav_container(data: &[u8]) -> Option<&[u8]> {
    if data.len() < 44 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return None;
    }

    // Walk the chunk list starting after the 12-byte RIFF header.
    let mut offset = 12;
    while offset + 8 <= data.len() {
        let chunk_id = &data[offset..offset + 4];
        let chunk_len = LittleEndian::read_u32(&data[offset + 4..offset + 8]) as usize;
        let body_start = offset + 8;

        if chunk_id == b"data" {
            let body_end = body_start.checked_add(chunk_len)?.min(data.len());
            return Some(&data[body_start..body_end]);
        }

        // Chunks are word-aligned.
        offset = body_start + chunk_len + (chunk_len % 2);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    /// Build a minimal WAV file around the given PCM payload.
    fn wav_bytes(pcm: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.write_u32::<LittleEndian>(36 + pcm.len() as u32).unwrap();
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.write_u32::<LittleEndian>(16).unwrap();
        out.write_u16::<LittleEndian>(1).unwrap(); // PCM
        out.write_u16::<LittleEndian>(1).unwrap(); // mono
        out.write_u32::<LittleEndian>(16_000).unwrap();
        out.write_u32::<LittleEndian>(32_000).unwrap();
        out.write_u16::<LittleEndian>(2).unwrap();
        out.write_u16::<LittleEndian>(16).unwrap();
        out.extend_from_slice(b"data");
        out.write_u32::<LittleEndian>(pcm.len() as u32).unwrap();
        out.extend_from_slice(pcm);
        out
    }

    #[test]
    fn test_accumulator_reports_ready_at_threshold() {
        let mut acc = AudioAccumulator::new(10);
        acc.append(&[0u8; 9]);
        assert!(!acc.should_drain());
        acc.append(&[0u8; 1]);
        assert!(acc.should_drain());
    }

    #[test]
    fn test_drain_returns_everything_and_clears() {
        let mut acc = AudioAccumulator::new(4);
        acc.append(&[1, 2]);
        acc.append(&[3, 4, 5]);

        let drained = acc.drain();
        assert_eq!(drained, vec![1, 2, 3, 4, 5]);
        assert!(acc.is_empty());
        assert!(!acc.should_drain());
    }

    #[test]
    fn test_back_to_back_appends_concatenate() {
        let mut acc = AudioAccumulator::new(1_000_000);
        acc.append(&[0xAA; 100]);
        acc.append(&[0xBB; 50]);

        let drained = acc.drain();
        assert_eq!(drained.len(), 150);
        assert_eq!(&drained[..100], &[0xAA; 100][..]);
        assert_eq!(&drained[100..], &[0xBB; 50][..]);
    }

    #[test]
    fn test_normalize_strips_wav_header() {
        let pcm = vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let wav = wav_bytes(&pcm);
        assert_eq!(normalize_chunk(&wav), pcm);
    }

    #[test]
    fn test_normalize_passes_raw_bytes_through() {
        let raw = vec![9u8; 64];
        assert_eq!(normalize_chunk(&raw), raw);

        // Too short to be a container.
        let tiny = vec![1, 2, 3];
        assert_eq!(normalize_chunk(&tiny), tiny);
    }
}
