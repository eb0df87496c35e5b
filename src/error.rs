// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Error taxonomy for visavis.
//!
//! Transport failures end the session; transcription, reasoning and
//! synthesis failures end only the turn they belong to. The session loop
//! logs turn-level failures and returns to idle without retrying.

/// Session-fatal transport failures.
///
/// Anything in here means the room connection is unusable and the session
/// must tear down. Reconnection is the transport's job, not ours.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("malformed wire message: {0}")]
    Codec(#[from] serde_json::Error),
    #[error("invalid media payload: {0}")]
    Payload(String),
    #[error("room closed: {0}")]
    Closed(String),
}

/// Turn-level failure while transcribing an utterance.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Turn-level failure while producing a response.
#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response contained no choices")]
    EmptyResponse,
}

/// Turn-level failure while synthesizing speech.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("audio stream interrupted: {0}")]
    Stream(String),
}

/// Failures while fetching or caching model assets.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("home directory not found")]
    NoHomeDir,
}

/// Configuration problems detected at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidVar { name: &'static str, value: String },
}

/// Failures while bringing a session up.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[cfg(feature = "silero-vad")]
    #[error("VAD model failed to load: {0}")]
    Vad(#[from] crate::vad::silero::SileroError),
}

/// The stage a turn-level failure belongs to, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Transcription,
    Reasoning,
    Synthesis,
}

impl std::fmt::Display for TurnStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnStage::Transcription => write!(f, "transcription"),
            TurnStage::Reasoning => write!(f, "reasoning"),
            TurnStage::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// Any turn-level failure, tagged with the stage it came from.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),
    #[error("reasoning failed: {0}")]
    Reasoning(#[from] ReasoningError),
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
}

impl TurnError {
    /// Which stage produced this failure.
    pub fn stage(&self) -> TurnStage {
        match self {
            TurnError::Transcription(_) => TurnStage::Transcription,
            TurnError::Reasoning(_) => TurnStage::Reasoning,
            TurnError::Synthesis(_) => TurnStage::Synthesis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_error_stage_mapping() {
        let err = TurnError::Reasoning(ReasoningError::EmptyResponse);
        assert_eq!(err.stage(), TurnStage::Reasoning);
        assert_eq!(err.stage().to_string(), "reasoning");
    }

    #[test]
    fn test_turn_error_display_includes_stage() {
        let err = TurnError::Synthesis(SynthesisError::Stream("reset".into()));
        let msg = err.to_string();
        assert!(msg.contains("synthesis failed"));
        assert!(msg.contains("reset"));
    }
}
