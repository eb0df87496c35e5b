// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! OpenAI reasoning and speech synthesis.
//!
//! - [`OpenAiReasoning`] — one-shot chat completion against
//!   `/v1/chat/completions` (or any compatible API). Vision-capable: image
//!   content parts pass through untouched in the message list.
//! - [`OpenAiTts`] — `/v1/audio/speech` synthesis returning raw 24 kHz
//!   PCM16 as a chunk stream, so playback starts before synthesis ends.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::error::{ReasoningError, SynthesisError};
use crate::services::{
    ReasoningRequest, ReasoningService, SynthesisService, SynthesizedAudio,
};

// ---------------------------------------------------------------------------
// OpenAI API request / response types
// ---------------------------------------------------------------------------

/// Body sent to `/v1/chat/completions`.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<serde_json::Value>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

/// Non-streaming completions response.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Body sent to `/v1/audio/speech`.
#[derive(Debug, Serialize)]
struct SpeechRequest {
    model: String,
    input: String,
    voice: String,
    response_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f64>,
}

// ============================================================================
// OpenAiReasoning
// ============================================================================

/// One-shot chat-completion client.
pub struct OpenAiReasoning {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
    /// Optional temperature override.
    temperature: Option<f64>,
    /// Optional max_tokens override.
    max_tokens: Option<u64>,
}

impl OpenAiReasoning {
    /// Default model used when none is specified.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o";

    /// Default base URL for the OpenAI API.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    /// Create a new client. Pass an empty model to use
    /// [`Self::DEFAULT_MODEL`].
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let model = if model.is_empty() {
            Self::DEFAULT_MODEL.to_string()
        } else {
            model
        };

        Self {
            api_key: api_key.into(),
            model,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(90))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Builder method: set a custom base URL (Azure OpenAI, local proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builder method: set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Builder method: set the maximum number of tokens in the response.
    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[async_trait]
impl ReasoningService for OpenAiReasoning {
    async fn respond(&self, request: ReasoningRequest) -> Result<String, ReasoningError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: self.model.clone(),
            messages: request.messages,
            stream: false,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            messages = body.messages.len(),
            "requesting chat completion"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(ReasoningError::Api { status, message });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or(ReasoningError::EmptyResponse)
    }
}

impl std::fmt::Debug for OpenAiReasoning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiReasoning")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

// ============================================================================
// OpenAiTts
// ============================================================================

/// Speech synthesis via `/v1/audio/speech`.
///
/// Produces 24 kHz, 16-bit LE, mono PCM (`pcm` response format), streamed
/// chunk by chunk as the provider renders it.
pub struct OpenAiTts {
    api_key: String,
    model: String,
    voice: String,
    base_url: String,
    client: reqwest::Client,
    speed: Option<f64>,
}

impl OpenAiTts {
    /// Default TTS model.
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini-tts";
    /// Default voice.
    pub const DEFAULT_VOICE: &'static str = "alloy";
    /// OpenAI TTS always outputs at 24 kHz.
    pub const OPENAI_SAMPLE_RATE: u32 = 24_000;

    /// Create a new client. Empty strings select the defaults.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, voice: impl Into<String>) -> Self {
        let model = model.into();
        let model = if model.is_empty() {
            Self::DEFAULT_MODEL.to_string()
        } else {
            model
        };
        let voice = voice.into();
        let voice = if voice.is_empty() {
            Self::DEFAULT_VOICE.to_string()
        } else {
            voice
        };

        Self {
            api_key: api_key.into(),
            model,
            voice,
            base_url: OpenAiReasoning::DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
            speed: None,
        }
    }

    /// Builder method: set a custom base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builder method: set the speaking speed (0.25 to 4.0).
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }
}

#[async_trait]
impl SynthesisService for OpenAiTts {
    async fn synthesize(&self, text: &str) -> Result<SynthesizedAudio, SynthesisError> {
        let url = format!("{}/v1/audio/speech", self.base_url);
        let body = SpeechRequest {
            model: self.model.clone(),
            input: text.to_string(),
            voice: self.voice.clone(),
            response_format: "pcm".to_string(),
            speed: self.speed,
        };

        tracing::debug!(
            model = %self.model,
            voice = %self.voice,
            chars = text.len(),
            "requesting speech synthesis"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SynthesisError::Api { status, message });
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(SynthesisError::Http))
            .boxed();

        Ok(SynthesizedAudio {
            sample_rate: Self::OPENAI_SAMPLE_RATE,
            stream,
        })
    }
}

impl std::fmt::Debug for OpenAiTts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTts")
            .field("model", &self.model)
            .field("voice", &self.voice)
            .finish()
    }
}
