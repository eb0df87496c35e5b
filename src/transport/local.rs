// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! In-memory room for tests and local development.
//!
//! [`LocalRoom::pair`] returns two halves of a connected room: the
//! [`LocalRoomDriver`] plays the role of the transport (inject events,
//! observe playback), the [`LocalRoom`] is handed to the agent.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::audio::AudioChunk;
use crate::error::TransportError;
use crate::transport::{AudioSink, CapturedFrame, RoomEvent, RoomSource, TrackKind};

/// What the assistant asked the transport to do with playback audio.
#[derive(Debug, Clone)]
pub enum SinkOp {
    Chunk(AudioChunk),
    Clear,
}

/// Agent-side half: a room source plus its audio sink.
pub struct LocalRoom {
    events: mpsc::UnboundedReceiver<RoomEvent>,
    sink: LocalAudioSink,
}

impl LocalRoom {
    /// Create a connected in-memory room.
    pub fn pair() -> (LocalRoomDriver, LocalRoom) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (op_tx, op_rx) = mpsc::unbounded_channel();
        let driver = LocalRoomDriver {
            events: event_tx,
            playback: op_rx,
        };
        let room = LocalRoom {
            events: event_rx,
            sink: LocalAudioSink { ops: op_tx },
        };
        (driver, room)
    }

    /// The audio sink paired with this room. Cheap to clone.
    pub fn sink(&self) -> LocalAudioSink {
        self.sink.clone()
    }
}

#[async_trait]
impl RoomSource for LocalRoom {
    async fn next_event(&mut self) -> Option<RoomEvent> {
        self.events.recv().await
    }
}

/// Transport-side half: injects room events, observes playback.
pub struct LocalRoomDriver {
    events: mpsc::UnboundedSender<RoomEvent>,
    playback: mpsc::UnboundedReceiver<SinkOp>,
}

impl LocalRoomDriver {
    fn send(&self, event: RoomEvent) {
        // A closed channel means the session is gone; nothing to deliver to.
        let _ = self.events.send(event);
    }

    pub fn participant_joined(&self, identity: &str) {
        self.send(RoomEvent::ParticipantJoined {
            identity: identity.to_string(),
        });
    }

    pub fn participant_left(&self, identity: &str) {
        self.send(RoomEvent::ParticipantLeft {
            identity: identity.to_string(),
        });
    }

    pub fn publish_track(&self, identity: &str, kind: TrackKind) {
        self.send(RoomEvent::TrackPublished {
            identity: identity.to_string(),
            kind,
        });
    }

    pub fn unpublish_track(&self, identity: &str, kind: TrackKind) {
        self.send(RoomEvent::TrackUnpublished {
            identity: identity.to_string(),
            kind,
        });
    }

    pub fn audio(&self, chunk: AudioChunk) {
        self.send(RoomEvent::Audio(chunk));
    }

    pub fn video(&self, frame: CapturedFrame) {
        self.send(RoomEvent::Video(frame));
    }

    pub fn data(&self, text: &str) {
        self.send(RoomEvent::Data {
            text: text.to_string(),
        });
    }

    pub fn disconnect(&self, reason: &str) {
        self.send(RoomEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Next playback operation the assistant performed, if any.
    pub async fn next_playback(&mut self) -> Option<SinkOp> {
        self.playback.recv().await
    }

    /// Non-blocking variant of [`next_playback`](Self::next_playback).
    pub fn try_playback(&mut self) -> Option<SinkOp> {
        self.playback.try_recv().ok()
    }
}

/// Sink half of a [`LocalRoom`].
#[derive(Clone)]
pub struct LocalAudioSink {
    ops: mpsc::UnboundedSender<SinkOp>,
}

#[async_trait]
impl AudioSink for LocalAudioSink {
    async fn write(&self, chunk: AudioChunk) -> Result<(), TransportError> {
        self.ops
            .send(SinkOp::Chunk(chunk))
            .map_err(|_| TransportError::Closed("local room dropped".into()))
    }

    async fn clear(&self) -> Result<(), TransportError> {
        self.ops
            .send(SinkOp::Clear)
            .map_err(|_| TransportError::Closed("local room dropped".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_flow_in_order() {
        let (driver, mut room) = LocalRoom::pair();
        driver.participant_joined("user-1");
        driver.publish_track("user-1", TrackKind::Microphone);
        driver.disconnect("done");

        assert!(matches!(
            room.next_event().await,
            Some(RoomEvent::ParticipantJoined { .. })
        ));
        assert!(matches!(
            room.next_event().await,
            Some(RoomEvent::TrackPublished {
                kind: TrackKind::Microphone,
                ..
            })
        ));
        assert!(matches!(
            room.next_event().await,
            Some(RoomEvent::Disconnected { .. })
        ));
    }

    #[tokio::test]
    async fn test_dropped_driver_ends_stream() {
        let (driver, mut room) = LocalRoom::pair();
        drop(driver);
        assert!(room.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_sink_ops_observed_by_driver() {
        let (mut driver, room) = LocalRoom::pair();
        let sink = room.sink();
        sink.write(AudioChunk::new(vec![0u8; 4], 24000)).await.unwrap();
        sink.clear().await.unwrap();

        assert!(matches!(driver.next_playback().await, Some(SinkOp::Chunk(_))));
        assert!(matches!(driver.next_playback().await, Some(SinkOp::Clear)));
    }

    #[tokio::test]
    async fn test_sink_write_after_drop_is_closed() {
        let (driver, room) = LocalRoom::pair();
        let sink = room.sink();
        drop(driver);
        let err = sink.write(AudioChunk::new(vec![0u8; 4], 24000)).await;
        assert!(matches!(err, Err(TransportError::Closed(_))));
    }
}
