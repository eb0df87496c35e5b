// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Turn lifecycle types and the controller state machine.
//!
//! A turn is one user utterance and the assistant's reply to it. The
//! [`TurnController`] is a pure state machine: the session runner feeds it
//! [`TurnInput`]s (VAD boundaries, stage completions, typed messages) and
//! executes the [`TurnAction`]s it returns (spawn a stage, cancel a stage,
//! stop playback). Keeping the machine synchronous makes every transition
//! unit-testable without a runtime.

pub mod controller;

pub use controller::TurnController;

use crate::audio::AudioClip;
use crate::error::TurnError;
use crate::services::Transcript;

/// Identifies one turn within a session. Stage tasks tag their results
/// with the id they were spawned for, so results from a cancelled turn
/// are recognizably stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u64);

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the controller is in the turn lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// No user speech, nothing in flight.
    Idle,
    /// The user is speaking; audio is being captured.
    Listening,
    /// An utterance is out for transcription.
    Transcribing,
    /// A transcript is out for a model response.
    Reasoning,
    /// A response is being synthesized and played.
    Speaking,
}

/// What the user asked, and over which channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnPrompt {
    /// A transcribed utterance. Eligible for visual context.
    Voice(String),
    /// A typed data-channel message. Never carries a frame.
    Typed(String),
}

impl TurnPrompt {
    pub fn text(&self) -> &str {
        match self {
            TurnPrompt::Voice(text) | TurnPrompt::Typed(text) => text,
        }
    }
}

/// Events the session runner feeds into the controller.
#[derive(Debug)]
pub enum TurnInput {
    /// VAD detected the start of user speech.
    SpeechStarted,
    /// VAD detected the end of user speech; `audio` is the captured
    /// utterance including pre-roll.
    SpeechEnded { audio: AudioClip },
    /// The transcription stage finished.
    TranscriptReady { turn: TurnId, transcript: Transcript },
    /// The reasoning stage finished.
    ResponseReady { turn: TurnId, text: String },
    /// The playback stage drained the last chunk.
    PlaybackFinished { turn: TurnId },
    /// A stage failed. The turn is abandoned.
    StageFailed { turn: TurnId, error: TurnError },
    /// The user sent a typed message over the data channel.
    TextMessage { text: String },
    /// Speak a scripted line (the session greeting). Ignored unless idle.
    SayText { text: String },
}

/// Work the session runner must perform after a transition.
#[derive(Debug, PartialEq)]
pub enum TurnAction {
    /// Start accumulating utterance audio.
    BeginCapture,
    /// Spawn the transcription stage for this clip.
    Transcribe { turn: TurnId, audio: AudioClip },
    /// Spawn the reasoning stage for this prompt.
    Reason { turn: TurnId, prompt: TurnPrompt },
    /// Spawn synthesis and playback for this text.
    Speak { turn: TurnId, text: String },
    /// Cancel the named turn's in-flight stage task.
    CancelTurn { turn: TurnId },
    /// Stop playback immediately and flush any queued output audio.
    StopPlayback,
}
