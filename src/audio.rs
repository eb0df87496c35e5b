// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! PCM16 audio primitives.
//!
//! Everything in the session path is 16-bit signed little-endian PCM. This
//! module provides the chunk and clip types passed between the transport,
//! the VAD and the speech services, plus the small math helpers the energy
//! VAD is built on.

use std::collections::VecDeque;

use bytes::Bytes;

/// One block of PCM16 audio as delivered by the transport or a synthesis
/// stream. Cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Raw PCM16 bytes, little-endian, mono.
    pub pcm: Bytes,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioChunk {
    pub fn new(pcm: impl Into<Bytes>, sample_rate: u32) -> Self {
        Self {
            pcm: pcm.into(),
            sample_rate,
        }
    }

    /// Duration of this chunk in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        pcm_duration_ms(self.pcm.len(), self.sample_rate)
    }
}

/// A complete captured utterance, handed from the session loop to
/// transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub pcm: Vec<u8>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(pcm: Vec<u8>, sample_rate: u32) -> Self {
        Self { pcm, sample_rate }
    }

    pub fn is_empty(&self) -> bool {
        self.pcm.is_empty()
    }

    /// Duration of the clip in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        pcm_duration_ms(self.pcm.len(), self.sample_rate)
    }
}

/// Duration in milliseconds of `byte_len` bytes of mono PCM16 at
/// `sample_rate` Hz.
pub fn pcm_duration_ms(byte_len: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    let samples = (byte_len / 2) as u64;
    samples * 1000 / sample_rate as u64
}

/// Calculate the RMS volume of PCM16 audio, normalized to [0.0, 1.0].
///
/// Interprets the byte slice as little-endian 16-bit signed samples. 0.0 is
/// silence, 1.0 is a constant full-scale signal.
pub fn calculate_rms(pcm: &[u8]) -> f64 {
    let num_samples = pcm.len() / 2;
    if num_samples == 0 {
        return 0.0;
    }

    let mut sum_squares: f64 = 0.0;
    for i in 0..num_samples {
        let offset = i * 2;
        let sample = i16::from_le_bytes([pcm[offset], pcm[offset + 1]]) as f64;
        sum_squares += sample * sample;
    }

    let rms = (sum_squares / num_samples as f64).sqrt();
    (rms / i16::MAX as f64).clamp(0.0, 1.0)
}

/// Apply exponential smoothing to a value.
///
/// `factor` is in [0.0, 1.0]; higher values weight the new value more.
pub fn exp_smoothing(value: f64, prev_value: f64, factor: f64) -> f64 {
    prev_value + factor * (value - prev_value)
}

/// Convert PCM16 bytes to f32 samples in [-1.0, 1.0].
pub fn pcm_to_f32(pcm: &[u8]) -> Vec<f32> {
    pcm.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect()
}

/// Rolling buffer of the most recent audio, so the onset of an utterance
/// (heard before the VAD confirms speech) is not lost.
///
/// Chunks are pushed as they arrive; the buffer evicts from the front to
/// stay within its capacity. When speech is confirmed, [`take`] drains the
/// buffered lead-in in arrival order.
///
/// [`take`]: PreRollBuffer::take
#[derive(Debug)]
pub struct PreRollBuffer {
    chunks: VecDeque<Bytes>,
    buffered_bytes: usize,
    capacity_bytes: usize,
}

impl PreRollBuffer {
    /// Create a buffer holding roughly `capacity_ms` of mono PCM16 at
    /// `sample_rate` Hz.
    pub fn new(capacity_ms: u64, sample_rate: u32) -> Self {
        let capacity_bytes = (sample_rate as u64 * capacity_ms / 1000) as usize * 2;
        Self {
            chunks: VecDeque::new(),
            buffered_bytes: 0,
            capacity_bytes,
        }
    }

    pub fn push(&mut self, pcm: Bytes) {
        self.buffered_bytes += pcm.len();
        self.chunks.push_back(pcm);
        while self.buffered_bytes > self.capacity_bytes {
            match self.chunks.pop_front() {
                Some(evicted) => self.buffered_bytes -= evicted.len(),
                None => break,
            }
        }
    }

    /// Drain the buffered audio in arrival order.
    pub fn take(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.buffered_bytes);
        for chunk in self.chunks.drain(..) {
            out.extend_from_slice(&chunk);
        }
        self.buffered_bytes = 0;
        out
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.buffered_bytes = 0;
    }

    pub fn len_bytes(&self) -> usize {
        self.buffered_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: create PCM16 bytes from a slice of i16 samples.
    fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        for &s in samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_calculate_rms_silence() {
        let silence = samples_to_bytes(&[0, 0, 0, 0]);
        let rms = calculate_rms(&silence);
        assert!((rms - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_calculate_rms_max_amplitude() {
        // A constant signal at max amplitude should give ~1.0.
        let loud = samples_to_bytes(&[i16::MAX, i16::MAX, i16::MAX, i16::MAX]);
        let rms = calculate_rms(&loud);
        assert!((rms - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_calculate_rms_empty() {
        let rms = calculate_rms(&[]);
        assert!((rms - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exp_smoothing() {
        let result = exp_smoothing(1.0, 0.0, 0.2);
        assert!((result - 0.2).abs() < f64::EPSILON);

        let result2 = exp_smoothing(1.0, 0.5, 0.5);
        assert!((result2 - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pcm_to_f32_range() {
        let bytes = samples_to_bytes(&[0, i16::MAX, i16::MIN]);
        let samples = pcm_to_f32(&bytes);
        assert_eq!(samples.len(), 3);
        assert!((samples[0] - 0.0).abs() < f64::EPSILON as f32);
        assert!(samples[1] > 0.999);
        assert!((samples[2] + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_pcm_duration() {
        // 16000 Hz mono PCM16: 320 bytes == 10 ms.
        assert_eq!(pcm_duration_ms(320, 16000), 10);
        assert_eq!(pcm_duration_ms(0, 16000), 0);
        assert_eq!(pcm_duration_ms(320, 0), 0);
    }

    #[test]
    fn test_audio_clip_duration() {
        let clip = AudioClip::new(vec![0u8; 32000], 16000);
        assert_eq!(clip.duration_ms(), 1000);
    }

    #[test]
    fn test_pre_roll_evicts_oldest() {
        // Capacity of 10 ms at 16 kHz = 320 bytes.
        let mut ring = PreRollBuffer::new(10, 16000);
        ring.push(Bytes::from(vec![1u8; 200]));
        ring.push(Bytes::from(vec![2u8; 200]));
        ring.push(Bytes::from(vec![3u8; 200]));
        // First chunk must have been evicted to fit capacity.
        assert!(ring.len_bytes() <= 400);
        let drained = ring.take();
        assert_eq!(drained[0], 2);
        assert_eq!(*drained.last().unwrap(), 3);
        assert_eq!(ring.len_bytes(), 0);
    }

    #[test]
    fn test_pre_roll_take_preserves_order() {
        let mut ring = PreRollBuffer::new(1000, 16000);
        ring.push(Bytes::from(vec![1u8; 4]));
        ring.push(Bytes::from(vec![2u8; 4]));
        let drained = ring.take();
        assert_eq!(drained, vec![1, 1, 1, 1, 2, 2, 2, 2]);
    }
}
