// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Response playback.
//!
//! The [`ResponsePlayer`] drains one turn's synthesized audio stream into
//! the room's [`AudioSink`] in arrival order. It stops the moment its
//! cancellation token fires (barge-in) and treats a closed sink as the
//! user leaving: the rest of the response is dropped without a word.
//! Flushing audio the remote side has already buffered is the session
//! runner's job, via [`AudioSink::clear`].

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioChunk;
use crate::error::SynthesisError;
use crate::services::SynthesizedAudio;
use crate::transport::AudioSink;

/// How one playback run ended.
#[derive(Debug)]
pub enum PlaybackOutcome {
    /// Every chunk was written to the sink.
    Completed,
    /// The cancellation token fired mid-stream.
    Cancelled,
    /// The sink rejected a write; the room is gone or going.
    SinkClosed,
    /// The synthesis stream itself failed partway through.
    Failed(SynthesisError),
}

/// Writes synthesized speech to an audio sink, one turn at a time.
#[derive(Clone)]
pub struct ResponsePlayer {
    sink: Arc<dyn AudioSink>,
}

impl ResponsePlayer {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self { sink }
    }

    /// Drain `audio` into the sink until it ends, the token fires, or the
    /// sink closes.
    pub async fn play(
        &self,
        audio: SynthesizedAudio,
        cancel: &CancellationToken,
    ) -> PlaybackOutcome {
        let SynthesizedAudio {
            sample_rate,
            mut stream,
        } = audio;

        // Provider chunks split at arbitrary byte offsets; writes are kept
        // aligned to whole PCM16 samples so each one decodes on its own.
        let mut carry: Vec<u8> = Vec::new();
        let mut chunks_written = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(chunks_written, "playback cancelled");
                    return PlaybackOutcome::Cancelled;
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(bytes)) => {
                    carry.extend_from_slice(&bytes);
                    let aligned = carry.len() - (carry.len() % 2);
                    if aligned == 0 {
                        continue;
                    }
                    let rest = carry.split_off(aligned);
                    let pcm = std::mem::replace(&mut carry, rest);
                    if cancel.is_cancelled() {
                        tracing::debug!(chunks_written, "playback cancelled");
                        return PlaybackOutcome::Cancelled;
                    }
                    match self.sink.write(AudioChunk::new(pcm, sample_rate)).await {
                        Ok(()) => chunks_written += 1,
                        Err(error) => {
                            tracing::debug!(%error, "sink closed, abandoning response");
                            return PlaybackOutcome::SinkClosed;
                        }
                    }
                }
                Some(Err(error)) => {
                    tracing::warn!(%error, chunks_written, "synthesis stream failed");
                    return PlaybackOutcome::Failed(error);
                }
                None => break,
            }
        }

        if !carry.is_empty() {
            tracing::warn!(bytes = carry.len(), "dropping trailing partial sample");
        }
        tracing::debug!(chunks_written, "playback complete");
        PlaybackOutcome::Completed
    }
}

impl std::fmt::Debug for ResponsePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponsePlayer").finish()
    }
}
