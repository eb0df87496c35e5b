// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Silero VAD v5 neural-network backend.
//!
//! Wraps the Silero v5 ONNX model for speech probability inference and
//! debounces the per-chunk probabilities with [`SpeechMachine`]. Input is
//! consumed in 512-sample chunks at 16 kHz; the LSTM hidden state and a
//! 64-sample context window carry across calls.

use ndarray::{Array1, Array2, Array3, Ix3};
use ort::session::Session;
use ort::value::Tensor;

use crate::audio::pcm_to_f32;
use crate::error::AssetError;
use crate::vad::machine::{windows_spanning, SpeechMachine};
use crate::vad::{VadEvent, VadParams, VoiceActivityDetector};

/// Number of audio samples per inference call (32 ms at 16 kHz).
pub const SILERO_CHUNK_SAMPLES: usize = 512;

/// Context samples prepended to each chunk.
const CONTEXT_SAMPLES: usize = 64;

/// Total input size: chunk + context.
const INPUT_SIZE: usize = SILERO_CHUNK_SAMPLES + CONTEXT_SAMPLES; // 576

/// LSTM hidden state size.
const STATE_SIZE: usize = 128;

/// Chunk duration used for streak thresholds.
const CHUNK_MS: u64 = 32;

/// The only sample rate the model accepts.
pub const SILERO_SAMPLE_RATE: u32 = 16000;

/// Errors constructing or running Silero inference.
#[derive(Debug, thiserror::Error)]
pub enum SileroError {
    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("model asset error: {0}")]
    Asset(#[from] AssetError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Neural detector backed by Silero VAD v5.
///
/// Sessions at sample rates other than [`SILERO_SAMPLE_RATE`] must use
/// [`EnergyVad`](crate::vad::EnergyVad) instead; the model is fixed at
/// 16 kHz.
pub struct SileroVad {
    session: Session,
    /// LSTM state carried between inference calls, shape `[2, 1, 128]`.
    state: Array3<f32>,
    /// Last 64 samples from the previous chunk.
    context: Vec<f32>,
    machine: SpeechMachine,
    confidence: f64,
    /// Samples awaiting a full 512-sample chunk.
    pending: Vec<f32>,
}

impl SileroVad {
    /// Create a detector, fetching the model into the asset cache if it is
    /// not already there.
    pub async fn new(params: VadParams) -> Result<Self, SileroError> {
        let model_path = crate::assets::AssetManager::silero_vad().await?;
        Self::from_path(&model_path, params)
    }

    /// Create from a local ONNX model path.
    pub fn from_path(model_path: &std::path::Path, params: VadParams) -> Result<Self, SileroError> {
        let session = Session::builder()?
            .with_intra_threads(1)?
            .commit_from_file(model_path)?;

        let machine = SpeechMachine::new(
            windows_spanning(params.start_secs, CHUNK_MS),
            windows_spanning(params.stop_secs, CHUNK_MS),
        );

        Ok(Self {
            session,
            state: Array3::<f32>::zeros((2, 1, STATE_SIZE)),
            context: vec![0.0f32; CONTEXT_SAMPLES],
            machine,
            confidence: params.confidence,
            pending: Vec::with_capacity(INPUT_SIZE * 2),
        })
    }

    /// Run inference on exactly [`SILERO_CHUNK_SAMPLES`] samples, returning
    /// the speech probability in `[0.0, 1.0]`.
    fn infer(&mut self, chunk: &[f32]) -> Result<f32, SileroError> {
        if chunk.len() != SILERO_CHUNK_SAMPLES {
            return Err(SileroError::InvalidInput(format!(
                "expected {} samples, got {}",
                SILERO_CHUNK_SAMPLES,
                chunk.len()
            )));
        }

        // input: [1, 576] = context (64) + chunk (512)
        let mut input = Vec::with_capacity(INPUT_SIZE);
        input.extend_from_slice(&self.context);
        input.extend_from_slice(chunk);

        self.context
            .copy_from_slice(&chunk[SILERO_CHUNK_SAMPLES - CONTEXT_SAMPLES..]);

        let input_tensor = Array2::from_shape_vec((1, INPUT_SIZE), input)
            .map_err(|e| SileroError::InvalidInput(e.to_string()))?;
        let input_value = Tensor::from_array(input_tensor)?;

        // state: [2, 1, 128] carried from the previous call
        let state_value = Tensor::from_array(self.state.clone())?;

        // sr: [1]
        let sr_array = Array1::from_vec(vec![SILERO_SAMPLE_RATE as i64]);
        let sr_value = Tensor::from_array(sr_array)?;

        let outputs = self.session.run(ort::inputs![
            "input" => input_value,
            "state" => state_value,
            "sr" => sr_value,
        ])?;

        let output_array = outputs["output"].try_extract_array::<f32>()?;
        let probability = output_array.iter().next().copied().unwrap_or(0.0);

        let new_state_array = outputs["stateN"].try_extract_array::<f32>()?;
        self.state = new_state_array
            .to_owned()
            .into_dimensionality::<Ix3>()
            .map_err(|e| SileroError::InvalidInput(format!("state shape error: {}", e)))?;

        Ok(probability)
    }
}

impl VoiceActivityDetector for SileroVad {
    fn process(&mut self, pcm: &[u8]) -> VadEvent {
        self.pending.extend(pcm_to_f32(pcm));

        let mut confirmed = VadEvent::None;
        while self.pending.len() >= SILERO_CHUNK_SAMPLES {
            let chunk: Vec<f32> = self.pending.drain(..SILERO_CHUNK_SAMPLES).collect();
            match self.infer(&chunk) {
                Ok(probability) => {
                    let event = self.machine.step(probability as f64 >= self.confidence);
                    if event != VadEvent::None {
                        confirmed = event;
                    }
                }
                Err(e) => {
                    // Degrade to "no verdict" for this chunk; the energy
                    // backend remains the fallback for persistent failures.
                    tracing::warn!(error = %e, "silero inference failed");
                }
            }
        }
        confirmed
    }

    fn reset(&mut self) {
        self.state = Array3::<f32>::zeros((2, 1, STATE_SIZE));
        self.context = vec![0.0f32; CONTEXT_SAMPLES];
        self.pending.clear();
        self.machine.reset();
    }
}
