// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Room bookkeeping for the session loop: who is here, which tracks are
//! live, and the audio being captured for the current utterance.

use bytes::Bytes;

use crate::audio::{AudioClip, PreRollBuffer};
use crate::transport::TrackKind;

/// Participant and track state, fed from room events.
#[derive(Debug, Default)]
pub(crate) struct RoomState {
    participants: Vec<String>,
    camera_available: bool,
    mic_available: bool,
    greeted: bool,
}

impl RoomState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a join. Returns true the first time anyone joins, which is
    /// the greeting's cue.
    pub(crate) fn join(&mut self, identity: &str) -> bool {
        if !self.participants.iter().any(|p| p == identity) {
            self.participants.push(identity.to_string());
        }
        !std::mem::replace(&mut self.greeted, true)
    }

    pub(crate) fn leave(&mut self, identity: &str) {
        self.participants.retain(|p| p != identity);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub(crate) fn publish(&mut self, kind: TrackKind) {
        match kind {
            TrackKind::Microphone => self.mic_available = true,
            TrackKind::Camera => self.camera_available = true,
        }
    }

    pub(crate) fn unpublish(&mut self, kind: TrackKind) {
        match kind {
            TrackKind::Microphone => self.mic_available = false,
            TrackKind::Camera => self.camera_available = false,
        }
    }

    pub(crate) fn camera_available(&self) -> bool {
        self.camera_available
    }

    pub(crate) fn mic_available(&self) -> bool {
        self.mic_available
    }
}

/// Accumulates one utterance's audio.
///
/// Before speech is confirmed, chunks roll through a bounded pre-roll
/// buffer. [`begin`] promotes that lead-in to the active utterance;
/// [`finish`] hands the whole thing over as a clip.
///
/// [`begin`]: UtteranceCapture::begin
/// [`finish`]: UtteranceCapture::finish
#[derive(Debug)]
pub(crate) struct UtteranceCapture {
    pre_roll: PreRollBuffer,
    active: Vec<u8>,
    capturing: bool,
    sample_rate: u32,
}

impl UtteranceCapture {
    pub(crate) fn new(pre_roll_ms: u64, sample_rate: u32) -> Self {
        Self {
            pre_roll: PreRollBuffer::new(pre_roll_ms, sample_rate),
            active: Vec::new(),
            capturing: false,
            sample_rate,
        }
    }

    pub(crate) fn feed(&mut self, pcm: &Bytes) {
        if self.capturing {
            self.active.extend_from_slice(pcm);
        } else {
            self.pre_roll.push(pcm.clone());
        }
    }

    /// Start capturing, seeded with the pre-roll lead-in.
    pub(crate) fn begin(&mut self) {
        if self.capturing {
            return;
        }
        self.active = self.pre_roll.take();
        self.capturing = true;
    }

    /// Stop capturing and hand over the utterance.
    pub(crate) fn finish(&mut self) -> AudioClip {
        self.capturing = false;
        AudioClip::new(std::mem::take(&mut self.active), self.sample_rate)
    }

    /// Drop any partial capture without producing a clip.
    pub(crate) fn abort(&mut self) {
        if self.capturing {
            self.active.clear();
            self.capturing = false;
        }
    }

    pub(crate) fn is_capturing(&self) -> bool {
        self.capturing
    }
}
