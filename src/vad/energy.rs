// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Energy-based voice activity detection.
//!
//! Feeds 10 ms PCM16 windows through an RMS confidence check plus an
//! exponentially smoothed volume gate, then debounces the verdicts with
//! [`SpeechMachine`]. No model assets, no inference, works at any sample
//! rate.

use crate::audio::{calculate_rms, exp_smoothing};
use crate::vad::machine::{windows_spanning, SpeechMachine};
use crate::vad::{VadEvent, VadParams, VoiceActivityDetector};

/// Analysis window length.
const WINDOW_MS: u64 = 10;

/// Smoothing factor for the volume gate.
const VOLUME_SMOOTHING: f64 = 0.2;

/// RMS + volume-gated detector.
pub struct EnergyVad {
    params: VadParams,
    machine: SpeechMachine,
    /// Bytes per 10 ms analysis window at the session sample rate.
    window_bytes: usize,
    /// Partial window carried between process calls.
    pending: Vec<u8>,
    prev_volume: f64,
}

impl EnergyVad {
    pub fn new(params: VadParams, sample_rate: u32) -> Self {
        let window_bytes = (sample_rate as u64 * WINDOW_MS / 1000) as usize * 2;
        let machine = SpeechMachine::new(
            windows_spanning(params.start_secs, WINDOW_MS),
            windows_spanning(params.stop_secs, WINDOW_MS),
        );
        Self {
            params,
            machine,
            window_bytes,
            pending: Vec::with_capacity(4096),
            prev_volume: 0.0,
        }
    }

    pub fn params(&self) -> &VadParams {
        &self.params
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn process(&mut self, pcm: &[u8]) -> VadEvent {
        if self.window_bytes == 0 {
            return VadEvent::None;
        }

        self.pending.extend_from_slice(pcm);

        let mut confirmed = VadEvent::None;
        while self.pending.len() >= self.window_bytes {
            let window: Vec<u8> = self.pending.drain(..self.window_bytes).collect();

            let confidence = calculate_rms(&window);
            let volume = exp_smoothing(confidence, self.prev_volume, VOLUME_SMOOTHING);
            self.prev_volume = volume;

            let speaking =
                confidence >= self.params.confidence && volume >= self.params.min_volume;

            let event = self.machine.step(speaking);
            if event != VadEvent::None {
                confirmed = event;
            }
        }
        confirmed
    }

    fn reset(&mut self) {
        self.machine.reset();
        self.pending.clear();
        self.prev_volume = 0.0;
    }
}
