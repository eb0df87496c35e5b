// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Session orchestration.
//!
//! One [`Session`] owns everything for one room: the event source, the
//! VAD, the turn controller, the conversation context and the audio sink.
//! Sessions share nothing; the speech and reasoning services are handed in
//! behind `Arc` and are the only shared state. Run as many sessions
//! concurrently as you like, each on its own task.

mod listener;
mod runner;

pub use runner::Session;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::context::AttachPolicy;
use crate::services::{ReasoningService, SttService, SynthesisService};

/// The shared service stack a session talks to.
#[derive(Clone)]
pub struct SessionServices {
    pub stt: Arc<dyn SttService>,
    pub reasoning: Arc<dyn ReasoningService>,
    pub synthesis: Arc<dyn SynthesisService>,
}

/// Per-session tuning, typically derived from [`Config`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// System prompt seeded into the conversation. Empty for none.
    pub system_prompt: String,
    /// Line spoken when the first participant joins. Empty for none.
    pub greeting: String,
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

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            greeting: String::new(),
            confidence_floor: 0.4,
            attach_policy: AttachPolicy::VisualKeywords,
            max_frame_age: Duration::from_secs(2),
            input_sample_rate: 16_000,
            pre_roll_ms: 300,
        }
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            greeting: config.greeting.clone(),
            confidence_floor: config.confidence_floor,
            attach_policy: config.attach_policy,
            max_frame_age: config.max_frame_age,
            input_sample_rate: config.input_sample_rate,
            pre_roll_ms: config.pre_roll_ms,
        }
    }
}
