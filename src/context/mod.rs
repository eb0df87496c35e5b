// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Conversation context.
//!
//! [`ChatContext`] holds one session's rolling message history in
//! chat-completion JSON format with a system prompt prepended at request
//! time. [`FrameStore`] holds the single most recent camera frame; the
//! session loop overwrites it on every video event and the augmenter reads
//! it when a turn might want visual context. Neither type is shared across
//! sessions.

pub mod augmenter;

use std::time::{Duration, Instant};

use serde_json::json;

use crate::transport::CapturedFrame;

pub use augmenter::{AttachPolicy, ContextAugmenter};

/// Rolling conversation history for one session.
///
/// Messages are stored in chat-completion format (`role` + `content`).
/// Only text is persisted; image parts are attached per-request by the
/// augmenter and never enter the history.
#[derive(Debug, Clone)]
pub struct ChatContext {
    messages: Vec<serde_json::Value>,
    /// Prepended to messages at request-build time, not stored in history.
    system_prompt: Option<String>,
}

impl ChatContext {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: Some(prompt.into()),
        }
    }

    /// Add a single message with the given role and text content.
    pub fn add_message(&mut self, role: &str, content: &str) {
        self.messages.push(json!({
            "role": role,
            "content": content,
        }));
    }

    pub fn add_user_message(&mut self, text: &str) {
        self.add_message("user", text);
    }

    pub fn add_assistant_message(&mut self, text: &str) {
        self.add_message("assistant", text);
    }

    /// The stored history, without the system prompt.
    pub fn messages(&self) -> &[serde_json::Value] {
        &self.messages
    }

    /// History formatted for a reasoning call: system prompt first when
    /// one is set.
    pub fn messages_for_request(&self) -> Vec<serde_json::Value> {
        let mut result = Vec::with_capacity(self.messages.len() + 1);
        if let Some(ref prompt) = self.system_prompt {
            result.push(json!({
                "role": "system",
                "content": prompt,
            }));
        }
        result.extend(self.messages.iter().cloned());
        result
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ChatContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the most recent camera frame for one session.
///
/// Frames are transient: each video event replaces the previous frame,
/// and losing the camera track clears the store entirely.
#[derive(Debug, Default)]
pub struct FrameStore {
    latest: Option<CapturedFrame>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self { latest: None }
    }

    pub fn update(&mut self, frame: CapturedFrame) {
        self.latest = Some(frame);
    }

    pub fn clear(&mut self) {
        self.latest = None;
    }

    pub fn latest(&self) -> Option<&CapturedFrame> {
        self.latest.as_ref()
    }

    /// The stored frame if it is at most `max_age` old at `now`.
    pub fn fresh(&self, max_age: Duration, now: Instant) -> Option<&CapturedFrame> {
        self.latest.as_ref().filter(|f| f.age(now) <= max_age)
    }
}
