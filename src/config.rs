// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Environment-driven configuration.
//!
//! Everything the agent needs comes from environment variables (loaded
//! from `.env` by the binary before this runs). Only the two API keys are
//! required; everything else has a sensible default for a 16 kHz voice
//! session with keyword-gated vision.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::context::AttachPolicy;
use crate::error::ConfigError;
use crate::vad::VadParams;

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a friendly, helpful assistant on a real-time voice call. \
     The user may share their camera; when a frame is attached to a message, \
     describe and use what you see. Keep responses warm, conversational and \
     short, one or two sentences unless the user asks for more detail.";

const DEFAULT_GREETING: &str = "Hi there! How can I help?";

/// Which voice activity detector the session runner builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadBackend {
    /// RMS energy gate. No model download, always available.
    Energy,
    /// Silero ONNX model. Requires the `silero-vad` feature and a prior
    /// `download-files` run.
    Silero,
}

impl FromStr for VadBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "energy" => Ok(VadBackend::Energy),
            "silero" => Ok(VadBackend::Silero),
            other => Err(format!("unknown VAD backend: {}", other)),
        }
    }
}

/// Fully resolved agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub deepgram_api_key: String,
    pub openai_api_key: String,
    /// Bridge websocket URL. `None` means it must come from the CLI.
    pub bridge_url: Option<String>,

    pub reasoning_model: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub system_prompt: String,
    /// Spoken once when the first participant joins. Empty disables it.
    pub greeting: String,

    pub vad_backend: VadBackend,
    pub vad: VadParams,
    /// Transcripts below this confidence are treated as silence.
    pub confidence_floor: f64,

    pub attach_policy: AttachPolicy,
    /// Camera frames older than this are never attached.
    pub max_frame_age: Duration,

    /// Sample rate of inbound microphone audio, in Hz.
    pub input_sample_rate: u32,
    /// Audio retained from just before speech onset, in milliseconds.
    pub pre_roll_ms: u64,
}

impl Config {
    /// Read configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            deepgram_api_key: require("DEEPGRAM_API_KEY")?,
            openai_api_key: require("OPENAI_API_KEY")?,
            bridge_url: optional("BRIDGE_URL"),
            reasoning_model: optional("OPENAI_MODEL").unwrap_or_default(),
            tts_model: optional("TTS_MODEL").unwrap_or_default(),
            tts_voice: optional("TTS_VOICE").unwrap_or_default(),
            system_prompt: optional("SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            greeting: env::var("GREETING").unwrap_or_else(|_| DEFAULT_GREETING.to_string()),
            vad_backend: parse_var("VAD_BACKEND", VadBackend::Energy)?,
            vad: VadParams {
                confidence: parse_var("VAD_CONFIDENCE", VadParams::default().confidence)?,
                start_secs: parse_var("VAD_START_SECS", VadParams::default().start_secs)?,
                stop_secs: parse_var("VAD_STOP_SECS", VadParams::default().stop_secs)?,
                min_volume: parse_var("VAD_MIN_VOLUME", VadParams::default().min_volume)?,
            },
            confidence_floor: parse_var("STT_CONFIDENCE_FLOOR", 0.4)?,
            attach_policy: parse_var("FRAME_ATTACH", AttachPolicy::VisualKeywords)?,
            max_frame_age: Duration::from_millis(parse_var("MAX_FRAME_AGE_MS", 2_000u64)?),
            input_sample_rate: parse_var("AUDIO_IN_SAMPLE_RATE", 16_000u32)?,
            pre_roll_ms: parse_var("PRE_ROLL_MS", 300u64)?,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVar { name, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment mutation is process-global, so everything lives in one
    // test that runs its scenarios in sequence.
    #[test]
    fn test_config_from_env() {
        env::set_var("DEEPGRAM_API_KEY", "dg-test");
        env::set_var("OPENAI_API_KEY", "sk-test");
        env::remove_var("BRIDGE_URL");
        env::remove_var("VAD_BACKEND");
        env::remove_var("STT_CONFIDENCE_FLOOR");

        let config = Config::from_env().unwrap();
        assert_eq!(config.deepgram_api_key, "dg-test");
        assert_eq!(config.bridge_url, None);
        assert_eq!(config.vad_backend, VadBackend::Energy);
        assert_eq!(config.confidence_floor, 0.4);
        assert_eq!(config.input_sample_rate, 16_000);
        assert_eq!(config.greeting, DEFAULT_GREETING);

        env::set_var("VAD_BACKEND", "silero");
        env::set_var("STT_CONFIDENCE_FLOOR", "0.6");
        env::set_var("GREETING", "");
        let config = Config::from_env().unwrap();
        assert_eq!(config.vad_backend, VadBackend::Silero);
        assert_eq!(config.confidence_floor, 0.6);
        assert!(config.greeting.is_empty());

        env::set_var("STT_CONFIDENCE_FLOOR", "not a number");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::InvalidVar {
                name: "STT_CONFIDENCE_FLOOR",
                ..
            })
        ));
        env::remove_var("STT_CONFIDENCE_FLOOR");

        env::remove_var("DEEPGRAM_API_KEY");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::MissingVar("DEEPGRAM_API_KEY"))
        ));

        env::remove_var("OPENAI_API_KEY");
        env::remove_var("VAD_BACKEND");
        env::remove_var("GREETING");
    }
}
