// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Per-turn visual context decisions.
//!
//! The augmenter builds the reasoning request for a turn and decides
//! whether it carries the most recent camera frame. Two policies:
//! attach on every turn, or only when the transcript sounds like a visual
//! question. Either way a frame older than the freshness bound is never
//! attached, and with no camera available no frame is attached under any
//! policy; the request then discloses that the model is working text-only.

use std::str::FromStr;
use std::time::{Duration, Instant};

use serde_json::json;

use crate::context::{ChatContext, FrameStore};
use crate::services::ReasoningRequest;
use crate::transport::CapturedFrame;
use crate::util::encode_base64;

/// Words that make a transcript smell like a question about something
/// visible. Deliberately generous: a spurious frame costs tokens, a
/// missing frame costs the answer.
const VISUAL_KEYWORDS: &[&str] = &[
    "see", "look", "looking", "screen", "show", "showing", "picture",
    "image", "photo", "camera", "wearing", "holding", "color", "colour",
    "read", "written", "this", "these",
];

/// Disclosure inserted when the camera is unavailable.
const TEXT_ONLY_DISCLOSURE: &str =
    "The user's camera is not available, so you cannot see anything. \
     Answer from the conversation alone, and say so if the user asks \
     about something visual.";

/// When a turn gets the current frame attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachPolicy {
    /// Attach a fresh frame to every voice turn.
    Always,
    /// Attach only when the transcript contains a visual keyword.
    VisualKeywords,
}

impl FromStr for AttachPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(AttachPolicy::Always),
            "keywords" => Ok(AttachPolicy::VisualKeywords),
            other => Err(format!("unknown attach policy: {}", other)),
        }
    }
}

/// Builds reasoning requests, attaching visual context per policy.
#[derive(Debug, Clone)]
pub struct ContextAugmenter {
    policy: AttachPolicy,
    /// Frames older than this are never attached.
    max_frame_age: Duration,
}

impl ContextAugmenter {
    pub fn new(policy: AttachPolicy, max_frame_age: Duration) -> Self {
        Self {
            policy,
            max_frame_age,
        }
    }

    /// Build the request for a spoken turn.
    ///
    /// `chat` holds the history up to but not including this utterance;
    /// the transcript becomes the final user message, as a two-part
    /// content array when a frame is attached.
    pub fn build_voice_request(
        &self,
        chat: &ChatContext,
        transcript: &str,
        camera_available: bool,
        frames: &FrameStore,
    ) -> ReasoningRequest {
        let mut messages = chat.messages_for_request();

        if !camera_available {
            messages.push(json!({
                "role": "system",
                "content": TEXT_ONLY_DISCLOSURE,
            }));
            messages.push(json!({
                "role": "user",
                "content": transcript,
            }));
            return ReasoningRequest { messages };
        }

        let frame = if self.wants_frame(transcript) {
            frames.fresh(self.max_frame_age, Instant::now())
        } else {
            None
        };

        match frame {
            Some(frame) => {
                tracing::debug!(
                    frame_age_ms = frame.age(Instant::now()).as_millis() as u64,
                    "attaching camera frame to reasoning request"
                );
                messages.push(json!({
                    "role": "user",
                    "content": [
                        {"type": "text", "text": transcript},
                        {"type": "image_url", "image_url": {"url": image_data_uri(frame)}},
                    ],
                }));
            }
            None => {
                messages.push(json!({
                    "role": "user",
                    "content": transcript,
                }));
            }
        }

        ReasoningRequest { messages }
    }

    /// Build the request for a typed (data-channel) turn. Text messages
    /// never carry a frame.
    pub fn build_text_request(&self, chat: &ChatContext, text: &str) -> ReasoningRequest {
        let mut messages = chat.messages_for_request();
        messages.push(json!({
            "role": "user",
            "content": text,
        }));
        ReasoningRequest { messages }
    }

    /// Policy decision, before freshness and availability checks.
    fn wants_frame(&self, transcript: &str) -> bool {
        match self.policy {
            AttachPolicy::Always => true,
            AttachPolicy::VisualKeywords => {
                let lowered = transcript.to_lowercase();
                lowered
                    .split(|c: char| !c.is_alphanumeric())
                    .any(|word| !word.is_empty() && VISUAL_KEYWORDS.contains(&word))
            }
        }
    }
}

/// Encode a frame as a `data:` URI for an `image_url` content part.
fn image_data_uri(frame: &CapturedFrame) -> String {
    format!("data:{};base64,{}", frame.mime_type, encode_base64(&frame.data))
}
