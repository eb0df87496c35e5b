// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Four-phase speech confirmation machine.
//!
//! Pure logic shared by every detector backend: per-window speech/no-speech
//! verdicts go in, confirmed [`VadEvent`] transitions come out. The phases
//! are `Quiet -> Starting -> Speaking -> Stopping -> Quiet`; a verdict
//! streak must span the configured number of windows before a transition
//! is confirmed, which filters out clicks and breath pauses.

use crate::vad::VadEvent;

/// Confirmation phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Quiet,
    Starting,
    Speaking,
    Stopping,
}

/// Streak-counting phase machine.
///
/// Backends decide per analysis window whether it sounds like speech; the
/// machine turns those verdicts into debounced start/stop events.
#[derive(Debug)]
pub struct SpeechMachine {
    phase: Phase,
    /// Consecutive speech windows required to confirm a start.
    start_windows: u32,
    /// Consecutive silence windows required to confirm a stop.
    stop_windows: u32,
    starting_count: u32,
    stopping_count: u32,
}

impl SpeechMachine {
    pub fn new(start_windows: u32, stop_windows: u32) -> Self {
        Self {
            phase: Phase::Quiet,
            start_windows: start_windows.max(1),
            stop_windows: stop_windows.max(1),
            starting_count: 0,
            stopping_count: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the machine currently considers the user to be speaking.
    pub fn is_speaking(&self) -> bool {
        matches!(self.phase, Phase::Speaking | Phase::Stopping)
    }

    /// Advance by one analysis window.
    pub fn step(&mut self, speaking: bool) -> VadEvent {
        if speaking {
            match self.phase {
                Phase::Quiet => {
                    self.phase = Phase::Starting;
                    self.starting_count = 1;
                }
                Phase::Starting => self.starting_count += 1,
                Phase::Stopping => {
                    // Speech resumed before the stop streak completed.
                    self.phase = Phase::Speaking;
                    self.stopping_count = 0;
                }
                Phase::Speaking => {}
            }
            if self.phase == Phase::Starting && self.starting_count >= self.start_windows {
                self.phase = Phase::Speaking;
                self.starting_count = 0;
                return VadEvent::SpeechStarted;
            }
        } else {
            match self.phase {
                Phase::Starting => {
                    // Never confirmed; treat as noise.
                    self.phase = Phase::Quiet;
                    self.starting_count = 0;
                }
                Phase::Speaking => {
                    self.phase = Phase::Stopping;
                    self.stopping_count = 1;
                }
                Phase::Stopping => self.stopping_count += 1,
                Phase::Quiet => {}
            }
            if self.phase == Phase::Stopping && self.stopping_count >= self.stop_windows {
                self.phase = Phase::Quiet;
                self.stopping_count = 0;
                return VadEvent::SpeechStopped;
            }
        }
        VadEvent::None
    }

    /// Return to [`Phase::Quiet`] with all streaks cleared.
    pub fn reset(&mut self) {
        self.phase = Phase::Quiet;
        self.starting_count = 0;
        self.stopping_count = 0;
    }
}

/// Number of analysis windows that span `secs` at one window per
/// `window_ms` milliseconds, never less than one.
pub fn windows_spanning(secs: f64, window_ms: u64) -> u32 {
    if window_ms == 0 {
        return 1;
    }
    let windows = (secs * 1000.0 / window_ms as f64).round() as u32;
    windows.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_quiet() {
        let m = SpeechMachine::new(2, 3);
        assert_eq!(m.phase(), Phase::Quiet);
        assert!(!m.is_speaking());
    }

    #[test]
    fn test_speech_streak_confirms_start() {
        let mut m = SpeechMachine::new(3, 3);
        assert_eq!(m.step(true), VadEvent::None);
        assert_eq!(m.step(true), VadEvent::None);
        assert_eq!(m.step(true), VadEvent::SpeechStarted);
        assert_eq!(m.phase(), Phase::Speaking);
    }

    #[test]
    fn test_interrupted_streak_resets() {
        let mut m = SpeechMachine::new(3, 3);
        m.step(true);
        m.step(true);
        // One quiet window aborts the start streak.
        assert_eq!(m.step(false), VadEvent::None);
        assert_eq!(m.phase(), Phase::Quiet);
        // The streak has to rebuild from scratch.
        m.step(true);
        m.step(true);
        assert_eq!(m.step(true), VadEvent::SpeechStarted);
    }

    #[test]
    fn test_silence_streak_confirms_stop() {
        let mut m = SpeechMachine::new(1, 3);
        assert_eq!(m.step(true), VadEvent::SpeechStarted);
        assert_eq!(m.step(false), VadEvent::None);
        assert_eq!(m.step(false), VadEvent::None);
        assert_eq!(m.step(false), VadEvent::SpeechStopped);
        assert_eq!(m.phase(), Phase::Quiet);
    }

    #[test]
    fn test_breath_pause_does_not_stop() {
        let mut m = SpeechMachine::new(1, 5);
        m.step(true);
        m.step(false);
        m.step(false);
        // Speech resumes before the stop streak completes.
        assert_eq!(m.step(true), VadEvent::None);
        assert_eq!(m.phase(), Phase::Speaking);
        assert!(m.is_speaking());
    }

    #[test]
    fn test_reset_clears_streaks() {
        let mut m = SpeechMachine::new(1, 3);
        m.step(true);
        m.step(false);
        m.reset();
        assert_eq!(m.phase(), Phase::Quiet);
        // A fresh stop streak is required after reset.
        m.step(true);
        assert_eq!(m.step(false), VadEvent::None);
    }

    #[test]
    fn test_windows_spanning() {
        // 200 ms of 10 ms windows.
        assert_eq!(windows_spanning(0.2, 10), 20);
        // 800 ms of 32 ms windows.
        assert_eq!(windows_spanning(0.8, 32), 25);
        // Never zero.
        assert_eq!(windows_spanning(0.001, 10), 1);
        assert_eq!(windows_spanning(1.0, 0), 1);
    }
}
