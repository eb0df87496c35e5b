// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Voice activity detection.
//!
//! The session loop owns one detector per session and feeds it every
//! microphone chunk. Detectors confirm utterance boundaries through the
//! shared four-phase machine in [`machine`]: a burst of energy does not
//! start an utterance and a short pause does not end one.
//!
//! Two backends:
//!
//! - [`energy::EnergyVad`] — RMS confidence with exponential volume
//!   smoothing, always available.
//! - [`silero::SileroVad`] — Silero v5 neural inference (`silero-vad`
//!   feature), for noisy rooms where energy gating misfires.

pub mod energy;
pub mod machine;
#[cfg(feature = "silero-vad")]
pub mod silero;

use serde::{Deserialize, Serialize};

pub use energy::EnergyVad;

/// Boundary event confirmed by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadEvent {
    /// No confirmed transition in this batch of audio.
    None,
    /// Sustained speech confirmed.
    SpeechStarted,
    /// Sustained silence after speech confirmed.
    SpeechStopped,
}

/// Detector tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadParams {
    /// Confidence threshold in [0.0, 1.0] a window must reach to count as
    /// speech.
    pub confidence: f64,
    /// Seconds of sustained speech required to confirm an utterance start.
    pub start_secs: f64,
    /// Seconds of sustained silence required to confirm an utterance end.
    pub stop_secs: f64,
    /// Minimum smoothed volume for the energy backend; ignored by neural
    /// backends.
    pub min_volume: f64,
}

impl Default for VadParams {
    fn default() -> Self {
        Self {
            confidence: 0.7,
            start_secs: 0.2,
            stop_secs: 0.8,
            min_volume: 0.6,
        }
    }
}

/// A voice activity detector consuming the session's microphone audio.
///
/// Implementations are owned by a single session task, so `&mut self` is
/// fine; they must still be `Send` to move into that task.
pub trait VoiceActivityDetector: Send {
    /// Feed PCM16 bytes at the session sample rate. Returns a boundary
    /// event once one is confirmed; partial windows are buffered
    /// internally.
    fn process(&mut self, pcm: &[u8]) -> VadEvent;

    /// Drop buffered audio and return to the quiet phase.
    fn reset(&mut self);
}
