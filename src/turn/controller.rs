// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! The turn controller state machine.

use crate::audio::AudioClip;
use crate::turn::{TurnAction, TurnId, TurnInput, TurnPhase, TurnPrompt};

/// Drives a session's turns through
/// idle -> listening -> transcribing -> reasoning -> speaking -> idle.
///
/// At most one turn is in flight at a time. A new user event (speech or a
/// typed message) while a turn is in flight cancels that turn before the
/// new one starts, and results tagged with a superseded [`TurnId`] are
/// dropped without effect. Stage failures abandon the turn: the machine
/// logs and returns to idle, and nothing is retried or spoken.
#[derive(Debug)]
pub struct TurnController {
    phase: TurnPhase,
    /// The turn whose stage task is currently in flight. `None` while
    /// idle or listening.
    current: Option<TurnId>,
    next_turn: u64,
    /// Transcripts below this confidence are treated as silence.
    confidence_floor: f64,
}

impl TurnController {
    pub fn new(confidence_floor: f64) -> Self {
        Self {
            phase: TurnPhase::Idle,
            current: None,
            next_turn: 1,
            confidence_floor,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// The in-flight turn, if any.
    pub fn current_turn(&self) -> Option<TurnId> {
        self.current
    }

    /// How many turns have been started over the controller's lifetime.
    pub fn turns_started(&self) -> u64 {
        self.next_turn - 1
    }

    /// Apply one input and return the actions the runner must execute,
    /// in order.
    pub fn handle(&mut self, input: TurnInput) -> Vec<TurnAction> {
        match input {
            TurnInput::SpeechStarted => self.on_speech_started(),
            TurnInput::SpeechEnded { audio } => self.on_speech_ended(audio),
            TurnInput::TranscriptReady { turn, transcript } => {
                if !self.is_current(turn, TurnPhase::Transcribing) {
                    return self.drop_stale(turn, "transcript");
                }
                if !transcript.is_usable(self.confidence_floor) {
                    tracing::debug!(
                        turn = %turn,
                        confidence = transcript.confidence,
                        "transcript unusable, dropping turn"
                    );
                    self.finish_turn();
                    return Vec::new();
                }
                self.phase = TurnPhase::Reasoning;
                vec![TurnAction::Reason {
                    turn,
                    prompt: TurnPrompt::Voice(transcript.text),
                }]
            }
            TurnInput::ResponseReady { turn, text } => {
                if !self.is_current(turn, TurnPhase::Reasoning) {
                    return self.drop_stale(turn, "response");
                }
                if text.trim().is_empty() {
                    tracing::debug!(turn = %turn, "empty response, dropping turn");
                    self.finish_turn();
                    return Vec::new();
                }
                self.phase = TurnPhase::Speaking;
                vec![TurnAction::Speak { turn, text }]
            }
            TurnInput::PlaybackFinished { turn } => {
                if !self.is_current(turn, TurnPhase::Speaking) {
                    return self.drop_stale(turn, "playback completion");
                }
                tracing::debug!(turn = %turn, "turn complete");
                self.finish_turn();
                Vec::new()
            }
            TurnInput::StageFailed { turn, error } => {
                if self.current != Some(turn) {
                    return self.drop_stale(turn, "failure");
                }
                tracing::warn!(
                    turn = %turn,
                    stage = %error.stage(),
                    error = %error,
                    "turn stage failed, returning to idle"
                );
                let mut actions = Vec::new();
                if self.phase == TurnPhase::Speaking {
                    actions.push(TurnAction::StopPlayback);
                }
                self.finish_turn();
                actions
            }
            TurnInput::TextMessage { text } => self.on_text_message(text),
            TurnInput::SayText { text } => self.on_say_text(text),
        }
    }

    fn on_speech_started(&mut self) -> Vec<TurnAction> {
        match self.phase {
            // Already capturing.
            TurnPhase::Listening => Vec::new(),
            TurnPhase::Idle => {
                self.phase = TurnPhase::Listening;
                vec![TurnAction::BeginCapture]
            }
            TurnPhase::Transcribing | TurnPhase::Reasoning | TurnPhase::Speaking => {
                let mut actions = self.cancel_inflight("user barge-in");
                self.phase = TurnPhase::Listening;
                actions.push(TurnAction::BeginCapture);
                actions
            }
        }
    }

    fn on_speech_ended(&mut self, audio: AudioClip) -> Vec<TurnAction> {
        if self.phase != TurnPhase::Listening {
            // A stop without a matching start; nothing was captured.
            return Vec::new();
        }
        if audio.is_empty() {
            tracing::debug!("utterance was empty, returning to idle");
            self.phase = TurnPhase::Idle;
            return Vec::new();
        }
        let turn = self.allocate_turn();
        self.phase = TurnPhase::Transcribing;
        vec![TurnAction::Transcribe { turn, audio }]
    }

    fn on_text_message(&mut self, text: String) -> Vec<TurnAction> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let mut actions = self.cancel_inflight("typed message");
        let turn = self.allocate_turn();
        self.phase = TurnPhase::Reasoning;
        actions.push(TurnAction::Reason {
            turn,
            prompt: TurnPrompt::Typed(text),
        });
        actions
    }

    fn on_say_text(&mut self, text: String) -> Vec<TurnAction> {
        if self.phase != TurnPhase::Idle {
            tracing::debug!("session busy, skipping scripted line");
            return Vec::new();
        }
        if text.trim().is_empty() {
            return Vec::new();
        }
        let turn = self.allocate_turn();
        self.phase = TurnPhase::Speaking;
        vec![TurnAction::Speak { turn, text }]
    }

    /// Cancel whatever is in flight, leaving the machine ready for a new
    /// turn. Returns the cancellation actions in the order the runner
    /// must apply them.
    fn cancel_inflight(&mut self, reason: &str) -> Vec<TurnAction> {
        let mut actions = Vec::new();
        if let Some(turn) = self.current.take() {
            tracing::debug!(turn = %turn, reason, "cancelling in-flight turn");
            actions.push(TurnAction::CancelTurn { turn });
            if self.phase == TurnPhase::Speaking {
                actions.push(TurnAction::StopPlayback);
            }
        }
        self.phase = TurnPhase::Idle;
        actions
    }

    fn allocate_turn(&mut self) -> TurnId {
        let turn = TurnId(self.next_turn);
        self.next_turn += 1;
        self.current = Some(turn);
        turn
    }

    fn finish_turn(&mut self) {
        self.current = None;
        self.phase = TurnPhase::Idle;
    }

    fn is_current(&self, turn: TurnId, expected_phase: TurnPhase) -> bool {
        self.current == Some(turn) && self.phase == expected_phase
    }

    fn drop_stale(&self, turn: TurnId, what: &str) -> Vec<TurnAction> {
        tracing::debug!(turn = %turn, "ignoring stale {what}");
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioClip;
    use crate::error::{ReasoningError, TranscriptionError, TurnError};
    use crate::services::Transcript;

    const FLOOR: f64 = 0.4;

    fn controller() -> TurnController {
        TurnController::new(FLOOR)
    }

    fn clip() -> AudioClip {
        AudioClip::new(vec![0u8; 3200], 16_000)
    }

    fn transcript(text: &str, confidence: f64) -> Transcript {
        Transcript {
            text: text.to_string(),
            confidence,
        }
    }

    /// Drive a controller to the transcribing phase and return the turn id.
    fn start_voice_turn(ctl: &mut TurnController) -> TurnId {
        ctl.handle(TurnInput::SpeechStarted);
        let actions = ctl.handle(TurnInput::SpeechEnded { audio: clip() });
        match &actions[0] {
            TurnAction::Transcribe { turn, .. } => *turn,
            other => panic!("expected Transcribe, got {:?}", other),
        }
    }

    #[test]
    fn test_speech_start_begins_capture() {
        let mut ctl = controller();
        let actions = ctl.handle(TurnInput::SpeechStarted);
        assert_eq!(actions, vec![TurnAction::BeginCapture]);
        assert_eq!(ctl.phase(), TurnPhase::Listening);
        assert_eq!(ctl.current_turn(), None);
    }

    #[test]
    fn test_repeated_speech_start_is_idempotent() {
        let mut ctl = controller();
        ctl.handle(TurnInput::SpeechStarted);
        let actions = ctl.handle(TurnInput::SpeechStarted);
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Listening);
    }

    #[test]
    fn test_full_voice_turn() {
        let mut ctl = controller();
        let turn = start_voice_turn(&mut ctl);
        assert_eq!(ctl.phase(), TurnPhase::Transcribing);
        assert_eq!(ctl.current_turn(), Some(turn));

        let actions = ctl.handle(TurnInput::TranscriptReady {
            turn,
            transcript: transcript("what time is it", 0.95),
        });
        assert_eq!(
            actions,
            vec![TurnAction::Reason {
                turn,
                prompt: TurnPrompt::Voice("what time is it".to_string()),
            }]
        );
        assert_eq!(ctl.phase(), TurnPhase::Reasoning);

        let actions = ctl.handle(TurnInput::ResponseReady {
            turn,
            text: "It's noon.".to_string(),
        });
        assert_eq!(
            actions,
            vec![TurnAction::Speak {
                turn,
                text: "It's noon.".to_string(),
            }]
        );
        assert_eq!(ctl.phase(), TurnPhase::Speaking);

        let actions = ctl.handle(TurnInput::PlaybackFinished { turn });
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Idle);
        assert_eq!(ctl.current_turn(), None);
    }

    #[test]
    fn test_empty_utterance_returns_to_idle() {
        let mut ctl = controller();
        ctl.handle(TurnInput::SpeechStarted);
        let actions = ctl.handle(TurnInput::SpeechEnded {
            audio: AudioClip::new(Vec::new(), 16_000),
        });
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_speech_end_without_start_is_ignored() {
        let mut ctl = controller();
        let actions = ctl.handle(TurnInput::SpeechEnded { audio: clip() });
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_empty_transcript_drops_turn_silently() {
        let mut ctl = controller();
        let turn = start_voice_turn(&mut ctl);
        let actions = ctl.handle(TurnInput::TranscriptReady {
            turn,
            transcript: transcript("", 0.9),
        });
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_low_confidence_transcript_drops_turn_silently() {
        let mut ctl = controller();
        let turn = start_voice_turn(&mut ctl);
        let actions = ctl.handle(TurnInput::TranscriptReady {
            turn,
            transcript: transcript("mumble mumble", 0.2),
        });
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Idle);
        assert_eq!(ctl.current_turn(), None);
    }

    #[test]
    fn test_barge_in_while_speaking_stops_playback() {
        let mut ctl = controller();
        let turn = start_voice_turn(&mut ctl);
        ctl.handle(TurnInput::TranscriptReady {
            turn,
            transcript: transcript("tell me a story", 0.9),
        });
        ctl.handle(TurnInput::ResponseReady {
            turn,
            text: "Once upon a time...".to_string(),
        });
        assert_eq!(ctl.phase(), TurnPhase::Speaking);

        let actions = ctl.handle(TurnInput::SpeechStarted);
        assert_eq!(
            actions,
            vec![
                TurnAction::CancelTurn { turn },
                TurnAction::StopPlayback,
                TurnAction::BeginCapture,
            ]
        );
        assert_eq!(ctl.phase(), TurnPhase::Listening);
        assert_eq!(ctl.current_turn(), None);
    }

    #[test]
    fn test_barge_in_while_reasoning_cancels_without_playback_stop() {
        let mut ctl = controller();
        let turn = start_voice_turn(&mut ctl);
        ctl.handle(TurnInput::TranscriptReady {
            turn,
            transcript: transcript("count to a thousand", 0.9),
        });
        assert_eq!(ctl.phase(), TurnPhase::Reasoning);

        let actions = ctl.handle(TurnInput::SpeechStarted);
        assert_eq!(
            actions,
            vec![TurnAction::CancelTurn { turn }, TurnAction::BeginCapture]
        );
        assert_eq!(ctl.phase(), TurnPhase::Listening);
    }

    #[test]
    fn test_stale_response_after_barge_in_is_dropped() {
        let mut ctl = controller();
        let first = start_voice_turn(&mut ctl);
        ctl.handle(TurnInput::TranscriptReady {
            turn: first,
            transcript: transcript("first question", 0.9),
        });
        // Barge-in supersedes the first turn and starts a second one.
        ctl.handle(TurnInput::SpeechStarted);
        let actions = ctl.handle(TurnInput::SpeechEnded { audio: clip() });
        let second = match &actions[0] {
            TurnAction::Transcribe { turn, .. } => *turn,
            other => panic!("expected Transcribe, got {:?}", other),
        };
        assert!(second > first);

        // The cancelled reasoning task still delivers its result.
        let actions = ctl.handle(TurnInput::ResponseReady {
            turn: first,
            text: "stale answer".to_string(),
        });
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Transcribing);
        assert_eq!(ctl.current_turn(), Some(second));
    }

    #[test]
    fn test_stale_failure_is_dropped() {
        let mut ctl = controller();
        let first = start_voice_turn(&mut ctl);
        ctl.handle(TurnInput::SpeechStarted);
        let actions = ctl.handle(TurnInput::StageFailed {
            turn: first,
            error: TurnError::Transcription(TranscriptionError::Api {
                status: 500,
                message: "server error".to_string(),
            }),
        });
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Listening);
    }

    #[test]
    fn test_stage_failure_returns_to_idle() {
        let mut ctl = controller();
        let turn = start_voice_turn(&mut ctl);
        ctl.handle(TurnInput::TranscriptReady {
            turn,
            transcript: transcript("hello", 0.9),
        });
        let actions = ctl.handle(TurnInput::StageFailed {
            turn,
            error: TurnError::Reasoning(ReasoningError::EmptyResponse),
        });
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Idle);
        assert_eq!(ctl.current_turn(), None);
    }

    #[test]
    fn test_synthesis_failure_while_speaking_flushes_output() {
        let mut ctl = controller();
        let turn = start_voice_turn(&mut ctl);
        ctl.handle(TurnInput::TranscriptReady {
            turn,
            transcript: transcript("hello", 0.9),
        });
        ctl.handle(TurnInput::ResponseReady {
            turn,
            text: "Hi!".to_string(),
        });
        let actions = ctl.handle(TurnInput::StageFailed {
            turn,
            error: TurnError::Synthesis(crate::error::SynthesisError::Stream(
                "connection reset".to_string(),
            )),
        });
        assert_eq!(actions, vec![TurnAction::StopPlayback]);
        assert_eq!(ctl.phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_text_message_while_idle_starts_reasoning() {
        let mut ctl = controller();
        let actions = ctl.handle(TurnInput::TextMessage {
            text: "hello there".to_string(),
        });
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            TurnAction::Reason { prompt, .. } => {
                assert_eq!(prompt, &TurnPrompt::Typed("hello there".to_string()));
            }
            other => panic!("expected Reason, got {:?}", other),
        }
        assert_eq!(ctl.phase(), TurnPhase::Reasoning);
    }

    #[test]
    fn test_text_message_supersedes_voice_turn() {
        let mut ctl = controller();
        let voice = start_voice_turn(&mut ctl);
        let actions = ctl.handle(TurnInput::TextMessage {
            text: "never mind, just tell me a joke".to_string(),
        });
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0], TurnAction::CancelTurn { turn: voice });
        match &actions[1] {
            TurnAction::Reason { turn, .. } => assert!(*turn > voice),
            other => panic!("expected Reason, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_text_message_is_ignored() {
        let mut ctl = controller();
        let actions = ctl.handle(TurnInput::TextMessage {
            text: "   ".to_string(),
        });
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Idle);
    }

    #[test]
    fn test_say_text_speaks_from_idle() {
        let mut ctl = controller();
        let actions = ctl.handle(TurnInput::SayText {
            text: "Hi there!".to_string(),
        });
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], TurnAction::Speak { .. }));
        assert_eq!(ctl.phase(), TurnPhase::Speaking);
    }

    #[test]
    fn test_say_text_is_skipped_when_busy() {
        let mut ctl = controller();
        ctl.handle(TurnInput::SpeechStarted);
        let actions = ctl.handle(TurnInput::SayText {
            text: "Hi there!".to_string(),
        });
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Listening);
    }

    #[test]
    fn test_barge_in_cancels_scripted_turn() {
        let mut ctl = controller();
        let actions = ctl.handle(TurnInput::SayText {
            text: "Hi there! How can I help?".to_string(),
        });
        let turn = match &actions[0] {
            TurnAction::Speak { turn, .. } => *turn,
            other => panic!("expected Speak, got {:?}", other),
        };

        let actions = ctl.handle(TurnInput::SpeechStarted);
        assert_eq!(
            actions,
            vec![
                TurnAction::CancelTurn { turn },
                TurnAction::StopPlayback,
                TurnAction::BeginCapture,
            ]
        );
        assert_eq!(ctl.phase(), TurnPhase::Listening);
    }

    #[test]
    fn test_playback_finished_for_wrong_turn_is_ignored() {
        let mut ctl = controller();
        let turn = start_voice_turn(&mut ctl);
        ctl.handle(TurnInput::TranscriptReady {
            turn,
            transcript: transcript("hello", 0.9),
        });
        ctl.handle(TurnInput::ResponseReady {
            turn,
            text: "Hi!".to_string(),
        });
        let actions = ctl.handle(TurnInput::PlaybackFinished { turn: TurnId(999) });
        assert!(actions.is_empty());
        assert_eq!(ctl.phase(), TurnPhase::Speaking);
    }

    #[test]
    fn test_turn_ids_are_monotonic() {
        let mut ctl = controller();
        let first = start_voice_turn(&mut ctl);
        ctl.handle(TurnInput::TranscriptReady {
            turn: first,
            transcript: transcript("", 0.0),
        });
        let second = start_voice_turn(&mut ctl);
        assert!(second > first);
    }
}
