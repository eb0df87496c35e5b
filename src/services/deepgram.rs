// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Deepgram speech-to-text.
//!
//! Posts complete utterance clips to Deepgram's prerecorded `/v1/listen`
//! endpoint as raw PCM16 and returns the top alternative with its
//! confidence. Utterance segmentation happens upstream in the session loop
//! (VAD), so there is no streaming connection to manage here.

use std::fmt::Write as _;

use async_trait::async_trait;
use serde::Deserialize;

use crate::audio::AudioClip;
use crate::error::TranscriptionError;
use crate::services::{SttService, Transcript};

// ---------------------------------------------------------------------------
// Deepgram JSON response types
// ---------------------------------------------------------------------------

/// Top-level prerecorded transcription response.
#[derive(Debug, Deserialize)]
struct DgResponse {
    #[serde(default)]
    results: Option<DgResults>,
}

#[derive(Debug, Deserialize)]
struct DgResults {
    #[serde(default)]
    channels: Vec<DgChannel>,
}

/// A single channel's transcription results.
#[derive(Debug, Deserialize)]
struct DgChannel {
    #[serde(default)]
    alternatives: Vec<DgAlternative>,
}

/// One alternative transcription for a channel.
#[derive(Debug, Deserialize)]
struct DgAlternative {
    transcript: String,
    confidence: f64,
}

// ---------------------------------------------------------------------------
// DeepgramStt
// ---------------------------------------------------------------------------

/// Prerecorded-mode Deepgram client.
pub struct DeepgramStt {
    api_key: String,
    model: String,
    /// Optional language code (e.g. `"en"`, `"es"`).
    language: Option<String>,
    /// Whether to request smart formatting (punctuation, numerals).
    smart_format: bool,
    base_url: String,
    client: reqwest::Client,
}

impl DeepgramStt {
    /// Default model used when none is specified.
    pub const DEFAULT_MODEL: &'static str = "nova-2";

    /// Default base URL for the Deepgram API.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.deepgram.com";

    /// Create a new client with defaults:
    ///
    /// - model: `"nova-2"`
    /// - language: `"en"`
    /// - smart_format: `true`
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: Self::DEFAULT_MODEL.to_string(),
            language: Some("en".to_string()),
            smart_format: true,
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(60))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Builder method: set the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder method: set the language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Builder method: enable or disable smart formatting.
    pub fn with_smart_format(mut self, enabled: bool) -> Self {
        self.smart_format = enabled;
        self
    }

    /// Builder method: set a custom base URL (for self-hosted Deepgram).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Build the request URL for a clip at the given sample rate.
    fn build_url(&self, sample_rate: u32) -> String {
        let mut url = format!(
            "{}/v1/listen?model={}&encoding=linear16&sample_rate={}&channels=1",
            self.base_url, self.model, sample_rate,
        );
        if let Some(ref lang) = self.language {
            let _ = write!(url, "&language={}", lang);
        }
        if self.smart_format {
            url.push_str("&smart_format=true");
        }
        url
    }

    /// Reduce a response to the top alternative of the first channel.
    ///
    /// Silence produces a response with an empty transcript rather than an
    /// error; the turn controller drops those quietly.
    fn transcript_from_response(response: DgResponse) -> Transcript {
        let alternative = response
            .results
            .and_then(|r| r.channels.into_iter().next())
            .and_then(|c| c.alternatives.into_iter().next());

        match alternative {
            Some(alt) => Transcript {
                text: alt.transcript,
                confidence: alt.confidence,
            },
            None => Transcript {
                text: String::new(),
                confidence: 0.0,
            },
        }
    }
}

#[async_trait]
impl SttService for DeepgramStt {
    async fn transcribe(&self, clip: AudioClip) -> Result<Transcript, TranscriptionError> {
        let url = self.build_url(clip.sample_rate);

        tracing::debug!(
            model = %self.model,
            clip_ms = clip.duration_ms(),
            "transcribing utterance"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "application/octet-stream")
            .body(clip.pcm)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Api { status, message });
        }

        let parsed: DgResponse = response.json().await?;
        Ok(Self::transcript_from_response(parsed))
    }
}

impl std::fmt::Debug for DeepgramStt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepgramStt")
            .field("model", &self.model)
            .field("language", &self.language)
            .field("smart_format", &self.smart_format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_defaults() {
        let stt = DeepgramStt::new("key");
        let url = stt.build_url(16000);
        assert!(url.starts_with("https://api.deepgram.com/v1/listen?"));
        assert!(url.contains("model=nova-2"));
        assert!(url.contains("encoding=linear16"));
        assert!(url.contains("sample_rate=16000"));
        assert!(url.contains("channels=1"));
        assert!(url.contains("language=en"));
        assert!(url.contains("smart_format=true"));
    }

    #[test]
    fn test_build_url_custom() {
        let stt = DeepgramStt::new("key")
            .with_model("nova-3")
            .with_language("es")
            .with_smart_format(false)
            .with_base_url("https://dg.internal.example.com");
        let url = stt.build_url(48000);
        assert!(url.starts_with("https://dg.internal.example.com/v1/listen?"));
        assert!(url.contains("model=nova-3"));
        assert!(url.contains("sample_rate=48000"));
        assert!(url.contains("language=es"));
        assert!(!url.contains("smart_format"));
    }

    #[test]
    fn test_parse_transcription_response() {
        let json = r#"{
            "metadata": {"request_id": "abc"},
            "results": {
                "channels": [
                    {
                        "alternatives": [
                            {"transcript": "what is on my screen", "confidence": 0.98},
                            {"transcript": "watt is on my screen", "confidence": 0.41}
                        ]
                    }
                ]
            }
        }"#;
        let parsed: DgResponse = serde_json::from_str(json).unwrap();
        let transcript = DeepgramStt::transcript_from_response(parsed);
        assert_eq!(transcript.text, "what is on my screen");
        assert!((transcript.confidence - 0.98).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_empty_response_is_silent_transcript() {
        let json = r#"{"results": {"channels": []}}"#;
        let parsed: DgResponse = serde_json::from_str(json).unwrap();
        let transcript = DeepgramStt::transcript_from_response(parsed);
        assert!(transcript.text.is_empty());
        assert!(!transcript.is_usable(0.4));
    }
}
