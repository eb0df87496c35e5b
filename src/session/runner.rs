// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! The session event loop.
//!
//! [`Session::run`] multiplexes two sources: room events from the
//! transport and stage results posted back by spawned turn tasks. Every
//! input funnels through the [`TurnController`]; this module's job is to
//! execute the actions it returns. Stage work (transcription, reasoning,
//! synthesis and playback) runs on spawned tasks so the loop never blocks
//! on a provider; each task tags its result with its [`TurnId`] and a
//! superseded task is cancelled through its token and ignored if it
//! manages to report anyway.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::audio::{AudioChunk, AudioClip};
use crate::context::{ChatContext, ContextAugmenter, FrameStore};
use crate::playback::{PlaybackOutcome, ResponsePlayer};
use crate::session::listener::{RoomState, UtteranceCapture};
use crate::session::{SessionOptions, SessionServices};
use crate::transport::{AudioSink, RoomEvent, RoomSource, TrackKind};
use crate::turn::{TurnAction, TurnController, TurnId, TurnInput, TurnPhase, TurnPrompt};
use crate::vad::{VadEvent, VoiceActivityDetector};

/// One room's conversation, start to finish.
pub struct Session {
    source: Box<dyn RoomSource>,
    results: mpsc::UnboundedReceiver<TurnInput>,
    core: Core,
}

impl Session {
    pub fn new(
        source: impl RoomSource + 'static,
        sink: Arc<dyn AudioSink>,
        vad: Box<dyn VoiceActivityDetector>,
        services: SessionServices,
        options: SessionOptions,
    ) -> Self {
        let SessionOptions {
            system_prompt,
            greeting,
            confidence_floor,
            attach_policy,
            max_frame_age,
            input_sample_rate,
            pre_roll_ms,
        } = options;

        let chat = if system_prompt.is_empty() {
            ChatContext::new()
        } else {
            ChatContext::with_system_prompt(system_prompt)
        };

        let (results_tx, results) = mpsc::unbounded_channel();

        Session {
            source: Box::new(source),
            results,
            core: Core {
                player: ResponsePlayer::new(Arc::clone(&sink)),
                sink,
                vad,
                services,
                controller: TurnController::new(confidence_floor),
                augmenter: ContextAugmenter::new(attach_policy, max_frame_age),
                chat,
                frames: FrameStore::new(),
                room: RoomState::new(),
                capture: UtteranceCapture::new(pre_roll_ms, input_sample_rate),
                greeting,
                results_tx,
                inflight: None,
            },
        }
    }

    /// Drive the session until the room disconnects or empties out.
    pub async fn run(self) {
        let Session {
            mut source,
            mut results,
            mut core,
        } = self;

        let started_at = chrono::Utc::now();
        tracing::info!(started_at = %started_at.to_rfc3339(), "session started");

        let reason = loop {
            tokio::select! {
                event = source.next_event() => match event {
                    Some(event) => {
                        if let Some(reason) = core.on_room_event(event).await {
                            break reason;
                        }
                    }
                    None => break "event stream ended".to_string(),
                },
                Some(input) = results.recv() => {
                    core.dispatch(input).await;
                }
            }
        };

        // Whatever is still in flight dies with the session.
        if let Some(inflight) = core.inflight.take() {
            inflight.cancel.cancel();
        }

        let duration = chrono::Utc::now() - started_at;
        tracing::info!(
            %reason,
            turns = core.controller.turns_started(),
            duration_secs = duration.num_seconds(),
            "session ended"
        );
    }
}

struct InflightTurn {
    turn: TurnId,
    cancel: CancellationToken,
}

/// Everything the loop mutates. Split from [`Session`] so the event
/// sources can be polled while the handlers borrow the rest.
struct Core {
    sink: Arc<dyn AudioSink>,
    player: ResponsePlayer,
    vad: Box<dyn VoiceActivityDetector>,
    services: SessionServices,
    controller: TurnController,
    augmenter: ContextAugmenter,
    chat: ChatContext,
    frames: FrameStore,
    room: RoomState,
    capture: UtteranceCapture,
    greeting: String,
    results_tx: mpsc::UnboundedSender<TurnInput>,
    inflight: Option<InflightTurn>,
}

impl Core {
    /// Handle one room event. Returns a reason when the session is over.
    async fn on_room_event(&mut self, event: RoomEvent) -> Option<String> {
        match event {
            RoomEvent::ParticipantJoined { identity } => {
                tracing::info!(identity = %identity, "participant joined");
                let first = self.room.join(&identity);
                if first && !self.greeting.is_empty() {
                    let text = self.greeting.clone();
                    self.dispatch(TurnInput::SayText { text }).await;
                }
                None
            }
            RoomEvent::ParticipantLeft { identity } => {
                tracing::info!(identity = %identity, "participant left");
                self.room.leave(&identity);
                if self.room.is_empty() {
                    return Some("room empty".to_string());
                }
                None
            }
            RoomEvent::TrackPublished { identity, kind } => {
                tracing::debug!(identity = %identity, ?kind, "track published");
                self.room.publish(kind);
                None
            }
            RoomEvent::TrackUnpublished { identity, kind } => {
                tracing::debug!(identity = %identity, ?kind, "track unpublished");
                self.room.unpublish(kind);
                match kind {
                    TrackKind::Camera => {
                        // Frames from a camera that is gone must never be
                        // attached again.
                        self.frames.clear();
                    }
                    TrackKind::Microphone => {
                        // The utterance in progress can never complete;
                        // drop it and let the controller settle.
                        self.vad.reset();
                        if self.capture.is_capturing() {
                            self.capture.abort();
                            let audio = self.capture.finish();
                            self.dispatch(TurnInput::SpeechEnded { audio }).await;
                        }
                    }
                }
                None
            }
            RoomEvent::Audio(chunk) => {
                self.on_audio(chunk).await;
                None
            }
            RoomEvent::Video(frame) => {
                self.frames.update(frame);
                None
            }
            RoomEvent::Data { text } => {
                tracing::debug!("data channel message received");
                self.dispatch(TurnInput::TextMessage { text }).await;
                None
            }
            RoomEvent::Disconnected { reason } => Some(reason),
        }
    }

    async fn on_audio(&mut self, chunk: AudioChunk) {
        if !self.room.mic_available() {
            // The transport must announce the track before sending audio.
            tracing::trace!("dropping audio for unannounced microphone");
            return;
        }
        self.capture.feed(&chunk.pcm);
        match self.vad.process(&chunk.pcm) {
            VadEvent::None => {}
            VadEvent::SpeechStarted => {
                self.dispatch(TurnInput::SpeechStarted).await;
            }
            VadEvent::SpeechStopped => {
                let audio = self.capture.finish();
                self.dispatch(TurnInput::SpeechEnded { audio }).await;
            }
        }
    }

    /// Run one input through the controller and execute its actions.
    async fn dispatch(&mut self, input: TurnInput) {
        let actions = self.controller.handle(input);
        for action in actions {
            self.execute(action).await;
        }
        if self.controller.current_turn().is_none() {
            self.inflight = None;
        }
        if self.controller.phase() != TurnPhase::Listening {
            // The controller moved on without consuming the capture
            // (a typed message landed mid-utterance).
            self.capture.abort();
        }
    }

    async fn execute(&mut self, action: TurnAction) {
        match action {
            TurnAction::BeginCapture => self.capture.begin(),
            TurnAction::Transcribe { turn, audio } => self.spawn_transcription(turn, audio),
            TurnAction::Reason { turn, prompt } => self.spawn_reasoning(turn, prompt),
            TurnAction::Speak { turn, text } => self.spawn_speech(turn, text),
            TurnAction::CancelTurn { turn } => {
                if self.inflight.as_ref().is_some_and(|i| i.turn == turn) {
                    if let Some(inflight) = self.inflight.take() {
                        inflight.cancel.cancel();
                    }
                }
            }
            TurnAction::StopPlayback => {
                if let Err(error) = self.sink.clear().await {
                    tracing::debug!(%error, "playback clear failed, room likely closing");
                }
            }
        }
    }

    fn spawn_transcription(&mut self, turn: TurnId, audio: AudioClip) {
        tracing::debug!(
            turn = %turn,
            duration_ms = audio.duration_ms(),
            "transcribing utterance"
        );
        let stt = Arc::clone(&self.services.stt);
        let results = self.results_tx.clone();
        let cancel = self.token_for(turn);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                outcome = stt.transcribe(audio) => outcome,
            };
            let input = match outcome {
                Ok(transcript) => TurnInput::TranscriptReady { turn, transcript },
                Err(error) => TurnInput::StageFailed {
                    turn,
                    error: error.into(),
                },
            };
            let _ = results.send(input);
        });
    }

    fn spawn_reasoning(&mut self, turn: TurnId, prompt: TurnPrompt) {
        let request = match &prompt {
            TurnPrompt::Voice(text) => self.augmenter.build_voice_request(
                &self.chat,
                text,
                self.room.camera_available(),
                &self.frames,
            ),
            TurnPrompt::Typed(text) => self.augmenter.build_text_request(&self.chat, text),
        };
        self.chat.add_user_message(prompt.text());

        let reasoning = Arc::clone(&self.services.reasoning);
        let results = self.results_tx.clone();
        let cancel = self.token_for(turn);
        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                outcome = reasoning.respond(request) => outcome,
            };
            let input = match outcome {
                Ok(text) => TurnInput::ResponseReady { turn, text },
                Err(error) => TurnInput::StageFailed {
                    turn,
                    error: error.into(),
                },
            };
            let _ = results.send(input);
        });
    }

    fn spawn_speech(&mut self, turn: TurnId, text: String) {
        self.chat.add_assistant_message(&text);

        let synthesis = Arc::clone(&self.services.synthesis);
        let player = self.player.clone();
        let results = self.results_tx.clone();
        let cancel = self.token_for(turn);
        tokio::spawn(async move {
            let synthesized = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                synthesized = synthesis.synthesize(&text) => synthesized,
            };
            let input = match synthesized {
                Ok(audio) => match player.play(audio, &cancel).await {
                    PlaybackOutcome::Completed => TurnInput::PlaybackFinished { turn },
                    PlaybackOutcome::Failed(error) => TurnInput::StageFailed {
                        turn,
                        error: error.into(),
                    },
                    // Cancelled playback was superseded; a closed sink
                    // means the room is going away. Nothing to report
                    // either way.
                    PlaybackOutcome::Cancelled | PlaybackOutcome::SinkClosed => return,
                },
                Err(error) => TurnInput::StageFailed {
                    turn,
                    error: error.into(),
                },
            };
            let _ = results.send(input);
        });
    }

    /// Token shared by all of one turn's stage tasks.
    fn token_for(&mut self, turn: TurnId) -> CancellationToken {
        match &self.inflight {
            Some(inflight) if inflight.turn == turn => inflight.cancel.clone(),
            _ => {
                let cancel = CancellationToken::new();
                self.inflight = Some(InflightTurn {
                    turn,
                    cancel: cancel.clone(),
                });
                cancel
            }
        }
    }
}
