// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Speech and reasoning collaborator traits.
//!
//! The turn pipeline only sees these traits; concrete providers live in
//! submodules. Implementations are shared across sessions behind `Arc`, so
//! everything here takes `&self` and is `Send + Sync`. A failed call fails
//! one turn, never the session, and is never retried here.

pub mod deepgram;
pub mod openai;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::audio::AudioClip;
use crate::error::{ReasoningError, SynthesisError, TranscriptionError};

pub use deepgram::DeepgramStt;
pub use openai::{OpenAiReasoning, OpenAiTts};

/// A transcribed utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Provider confidence in [0.0, 1.0].
    pub confidence: f64,
}

impl Transcript {
    /// Whether this transcript is worth reasoning about: non-empty after
    /// trimming and at or above the confidence floor.
    pub fn is_usable(&self, confidence_floor: f64) -> bool {
        !self.text.trim().is_empty() && self.confidence >= confidence_floor
    }
}

/// Input to one reasoning call: the full message list in chat-completion
/// format, already augmented (or deliberately not) with visual context.
#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    pub messages: Vec<serde_json::Value>,
}

/// One turn's synthesized speech: the output format plus a chunk stream
/// that yields PCM16 as the provider produces it.
pub struct SynthesizedAudio {
    pub sample_rate: u32,
    pub stream: BoxStream<'static, Result<Bytes, SynthesisError>>,
}

impl std::fmt::Debug for SynthesizedAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesizedAudio")
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Speech-to-text over one complete utterance clip.
#[async_trait]
pub trait SttService: Send + Sync {
    async fn transcribe(&self, clip: AudioClip) -> Result<Transcript, TranscriptionError>;
}

/// Chat-completion reasoning.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn respond(&self, request: ReasoningRequest) -> Result<String, ReasoningError>;
}

/// Text-to-speech synthesis.
#[async_trait]
pub trait SynthesisService: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, SynthesisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_usable_above_floor() {
        let t = Transcript {
            text: "what's on my screen".into(),
            confidence: 0.92,
        };
        assert!(t.is_usable(0.4));
    }

    #[test]
    fn test_transcript_empty_is_unusable() {
        let t = Transcript {
            text: "   ".into(),
            confidence: 0.99,
        };
        assert!(!t.is_usable(0.4));
    }

    #[test]
    fn test_transcript_low_confidence_is_unusable() {
        let t = Transcript {
            text: "uh".into(),
            confidence: 0.2,
        };
        assert!(!t.is_usable(0.4));
    }
}
