// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Top-level assembly.
//!
//! An [`Agent`] holds the configured service stack and stamps out
//! [`Session`]s. Services are built once and shared across sessions;
//! everything session-local (VAD, controller, context) is constructed
//! fresh per session.

use std::sync::Arc;

use crate::config::{Config, VadBackend};
use crate::error::StartupError;
use crate::services::{
    DeepgramStt, OpenAiReasoning, OpenAiTts, ReasoningService, SttService, SynthesisService,
};
use crate::session::{Session, SessionOptions, SessionServices};
use crate::transport::{AudioSink, BridgeRoom, RoomSource};
use crate::vad::{EnergyVad, VoiceActivityDetector};

/// Builds sessions from a fixed configuration and service stack.
pub struct Agent {
    config: Config,
    services: SessionServices,
}

impl Agent {
    /// Build the default provider stack from the configuration.
    pub fn new(config: Config) -> Self {
        let services = SessionServices {
            stt: Arc::new(DeepgramStt::new(&config.deepgram_api_key)),
            reasoning: Arc::new(OpenAiReasoning::new(
                &config.openai_api_key,
                &config.reasoning_model,
            )),
            synthesis: Arc::new(OpenAiTts::new(
                &config.openai_api_key,
                &config.tts_model,
                &config.tts_voice,
            )),
        };
        Self { config, services }
    }

    /// Swap the transcription service.
    pub fn with_stt(mut self, stt: Arc<dyn SttService>) -> Self {
        self.services.stt = stt;
        self
    }

    /// Swap the reasoning service.
    pub fn with_reasoning(mut self, reasoning: Arc<dyn ReasoningService>) -> Self {
        self.services.reasoning = reasoning;
        self
    }

    /// Swap the synthesis service.
    pub fn with_synthesis(mut self, synthesis: Arc<dyn SynthesisService>) -> Self {
        self.services.synthesis = synthesis;
        self
    }

    /// Connect to a bridge and prepare a session for its room.
    pub async fn connect(&self, url: &str) -> Result<Session, StartupError> {
        let room = BridgeRoom::connect(url).await?;
        let sink = Arc::new(room.sink());
        self.session(room, sink).await
    }

    /// Prepare a session over an already-established transport.
    pub async fn session(
        &self,
        source: impl RoomSource + 'static,
        sink: Arc<dyn AudioSink>,
    ) -> Result<Session, StartupError> {
        let vad = self.build_vad().await?;
        Ok(Session::new(
            source,
            sink,
            vad,
            self.services.clone(),
            SessionOptions::from(&self.config),
        ))
    }

    async fn build_vad(&self) -> Result<Box<dyn VoiceActivityDetector>, StartupError> {
        match self.config.vad_backend {
            VadBackend::Energy => Ok(Box::new(EnergyVad::new(
                self.config.vad.clone(),
                self.config.input_sample_rate,
            ))),
            #[cfg(feature = "silero-vad")]
            VadBackend::Silero => {
                if self.config.input_sample_rate != crate::vad::silero::SILERO_SAMPLE_RATE {
                    return Err(StartupError::Config(
                        crate::error::ConfigError::InvalidVar {
                            name: "AUDIO_IN_SAMPLE_RATE",
                            value: format!(
                                "{} (the Silero model only accepts 16000)",
                                self.config.input_sample_rate
                            ),
                        },
                    ));
                }
                let vad = crate::vad::silero::SileroVad::new(self.config.vad.clone()).await?;
                Ok(Box::new(vad))
            }
            #[cfg(not(feature = "silero-vad"))]
            VadBackend::Silero => Err(StartupError::Config(
                crate::error::ConfigError::InvalidVar {
                    name: "VAD_BACKEND",
                    value: "silero (built without the silero-vad feature)".to_string(),
                },
            )),
        }
    }
}
