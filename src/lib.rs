// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Visavis - Real-time voice and vision assistant core.
//!
//! Visavis runs conversational sessions over a room transport: it listens
//! for speech, transcribes finished utterances, reasons over the
//! conversation (optionally with the latest camera frame attached), and
//! speaks the response back, yielding immediately when the user barges
//! in. Sessions are independent; the speech and reasoning providers are
//! the only shared state.

pub mod agent;
pub mod assets;
pub mod audio;
pub mod config;
pub mod context;
pub mod error;
pub mod playback;
pub mod services;
pub mod session;
pub mod transport;
pub mod turn;
pub mod util;
pub mod vad;
