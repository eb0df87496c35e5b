// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Bridge wire format.
//!
//! The bridge forwards room traffic as JSON text messages over a
//! WebSocket. Media payloads are base64 in both directions.
//!
//! Incoming events:
//!
//! - `participant_joined` / `participant_left` - membership changes
//! - `track_published` / `track_unpublished` - media availability changes
//! - `audio` - base64 PCM16 at the announced sample rate
//! - `video` - base64 encoded image with its MIME type
//! - `data` - reliable data-channel text
//! - `disconnected` - the room connection ended
//!
//! The bridge announces a track with `track_published` before sending any
//! media for it; the session drops media from unannounced tracks.
//!
//! Outgoing messages:
//!
//! - `audio` - base64 PCM16 playback audio
//! - `clear` - drop queued playback audio (barge-in)

use serde::{Deserialize, Serialize};

use crate::audio::AudioChunk;
use crate::error::TransportError;
use crate::transport::{CapturedFrame, RoomEvent, TrackKind};
use crate::util::{decode_base64, encode_base64};

// ---------------------------------------------------------------------------
// Wire-format types
// ---------------------------------------------------------------------------

/// Top-level incoming bridge message.
#[derive(Deserialize, Debug)]
struct BridgeMessage {
    event: String,
    #[serde(default)]
    participant: Option<ParticipantPayload>,
    #[serde(default)]
    track: Option<TrackPayload>,
    #[serde(default)]
    media: Option<MediaPayload>,
    #[serde(default)]
    data: Option<DataPayload>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ParticipantPayload {
    identity: String,
}

#[derive(Deserialize, Debug)]
struct TrackPayload {
    kind: TrackKind,
}

#[derive(Deserialize, Debug)]
struct MediaPayload {
    /// Base64 media bytes.
    payload: String,
    #[serde(default)]
    sample_rate: Option<u32>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Deserialize, Debug)]
struct DataPayload {
    text: String,
}

/// Outgoing playback audio message.
#[derive(Serialize)]
struct AudioOut<'a> {
    event: &'a str,
    media: MediaOut,
}

#[derive(Serialize)]
struct MediaOut {
    payload: String,
    sample_rate: u32,
}

/// Outgoing control message with no payload.
#[derive(Serialize)]
struct ControlOut<'a> {
    event: &'a str,
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Default MIME type when a video message does not announce one.
const DEFAULT_FRAME_MIME: &str = "image/jpeg";

/// Decode one bridge text message into a [`RoomEvent`].
///
/// Returns `Ok(None)` for event types this version does not understand,
/// so newer bridges stay compatible.
pub fn decode_event(text: &str) -> Result<Option<RoomEvent>, TransportError> {
    let msg: BridgeMessage = serde_json::from_str(text)?;

    let event = match msg.event.as_str() {
        "participant_joined" => {
            let p = require_participant(msg.participant)?;
            Some(RoomEvent::ParticipantJoined { identity: p.identity })
        }
        "participant_left" => {
            let p = require_participant(msg.participant)?;
            Some(RoomEvent::ParticipantLeft { identity: p.identity })
        }
        "track_published" => {
            let p = require_participant(msg.participant)?;
            let t = require_track(msg.track)?;
            Some(RoomEvent::TrackPublished {
                identity: p.identity,
                kind: t.kind,
            })
        }
        "track_unpublished" => {
            let p = require_participant(msg.participant)?;
            let t = require_track(msg.track)?;
            Some(RoomEvent::TrackUnpublished {
                identity: p.identity,
                kind: t.kind,
            })
        }
        "audio" => {
            let media = require_media(msg.media)?;
            let pcm = decode_base64(&media.payload)
                .ok_or_else(|| TransportError::Payload("invalid base64 audio".into()))?;
            let sample_rate = media
                .sample_rate
                .ok_or_else(|| TransportError::Payload("audio without sample_rate".into()))?;
            Some(RoomEvent::Audio(AudioChunk::new(pcm, sample_rate)))
        }
        "video" => {
            let media = require_media(msg.media)?;
            let data = decode_base64(&media.payload)
                .ok_or_else(|| TransportError::Payload("invalid base64 frame".into()))?;
            let mime = media
                .mime_type
                .unwrap_or_else(|| DEFAULT_FRAME_MIME.to_string());
            Some(RoomEvent::Video(CapturedFrame::new(data, mime)))
        }
        "data" => {
            let data = msg
                .data
                .ok_or_else(|| TransportError::Payload("data event without payload".into()))?;
            Some(RoomEvent::Data { text: data.text })
        }
        "disconnected" => Some(RoomEvent::Disconnected {
            reason: msg.reason.unwrap_or_else(|| "bridge closed".to_string()),
        }),
        other => {
            tracing::debug!(event = other, "ignoring unknown bridge event");
            None
        }
    };

    Ok(event)
}

/// Encode one chunk of playback audio as a bridge text message.
pub fn encode_audio(chunk: &AudioChunk) -> Result<String, TransportError> {
    let msg = AudioOut {
        event: "audio",
        media: MediaOut {
            payload: encode_base64(&chunk.pcm),
            sample_rate: chunk.sample_rate,
        },
    };
    Ok(serde_json::to_string(&msg)?)
}

/// Encode the clear-playback control message.
pub fn encode_clear() -> Result<String, TransportError> {
    Ok(serde_json::to_string(&ControlOut { event: "clear" })?)
}

fn require_participant(
    p: Option<ParticipantPayload>,
) -> Result<ParticipantPayload, TransportError> {
    p.ok_or_else(|| TransportError::Payload("membership event without participant".into()))
}

fn require_track(t: Option<TrackPayload>) -> Result<TrackPayload, TransportError> {
    t.ok_or_else(|| TransportError::Payload("track event without track".into()))
}

fn require_media(m: Option<MediaPayload>) -> Result<MediaPayload, TransportError> {
    m.ok_or_else(|| TransportError::Payload("media event without media".into()))
}
