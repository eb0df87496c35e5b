// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Transport collaborator seam.
//!
//! The assistant never talks to a media server directly. It consumes
//! [`RoomEvent`]s from a [`RoomSource`] and writes playback audio to an
//! [`AudioSink`]; everything transport-specific (codecs, reconnection,
//! congestion) lives on the other side of these traits.
//!
//! Two implementations ship here: [`local::LocalRoom`], an in-memory pair
//! for tests and development, and [`bridge::BridgeRoom`], a WebSocket
//! client for a bridge process that forwards room traffic as JSON.

pub mod bridge;
pub mod local;
pub mod wire;

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::audio::AudioChunk;
use crate::error::TransportError;

pub use bridge::BridgeRoom;
pub use local::{LocalRoom, LocalRoomDriver};

/// Which kind of media a published track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Microphone,
    Camera,
}

/// One decoded video frame and the moment we received it.
///
/// Frames are held transiently in the session's frame store and never
/// persisted. `captured_at` is local receive time; remote capture clocks
/// are not trusted.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Encoded image bytes (typically JPEG).
    pub data: Bytes,
    /// MIME type of `data`.
    pub mime_type: String,
    pub captured_at: Instant,
}

impl CapturedFrame {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            captured_at: Instant::now(),
        }
    }

    /// Age of this frame relative to `now`.
    pub fn age(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.captured_at)
    }
}

/// Everything the transport can tell a session.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    ParticipantJoined { identity: String },
    ParticipantLeft { identity: String },
    TrackPublished { identity: String, kind: TrackKind },
    TrackUnpublished { identity: String, kind: TrackKind },
    /// Microphone audio at the session sample rate.
    Audio(AudioChunk),
    /// A decoded camera frame.
    Video(CapturedFrame),
    /// A reliable data-channel text message.
    Data { text: String },
    /// The room connection ended. Always the last event of a session.
    Disconnected { reason: String },
}

/// Ordered intake of room events.
///
/// Implementations emit at most one [`RoomEvent::Disconnected`], then
/// `None`. Consumers treat a bare end-of-stream like a disconnect.
#[async_trait]
pub trait RoomSource: Send {
    async fn next_event(&mut self) -> Option<RoomEvent>;
}

/// Ordered outbound playback audio.
///
/// Writes after the room has gone away fail with
/// [`TransportError::Closed`]; the response player treats that as expected
/// teardown, not a fault.
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Queue one chunk of playback audio, in order.
    async fn write(&self, chunk: AudioChunk) -> Result<(), TransportError>;

    /// Drop any playback audio still queued downstream. Used on barge-in.
    async fn clear(&self) -> Result<(), TransportError>;
}
