// Copyright (c) 2024-2026, Daily
// SPDX-License-Identifier: BSD-2-Clause

//! Latency benchmark for the per-turn hot paths.
//!
//! Run with: `cargo bench --bench turn_latency`

use std::hint::black_box;
use std::time::{Duration, Instant};

use bytes::Bytes;

use visavis::audio::AudioClip;
use visavis::context::{AttachPolicy, ChatContext, ContextAugmenter, FrameStore};
use visavis::services::Transcript;
use visavis::transport::CapturedFrame;
use visavis::turn::{TurnController, TurnInput};
use visavis::vad::{EnergyVad, VadParams, VoiceActivityDetector};

const TURN_ITERATIONS: usize = 100_000;
const VAD_SECONDS: usize = 1_000;
const AUGMENT_ITERATIONS: usize = 10_000;

fn main() {
    println!("Turn Pipeline Latency Benchmark");
    println!("===============================\n");

    // --- Full controller turn cycle ---
    {
        let mut controller = TurnController::new(0.4);
        let clip = AudioClip::new(vec![0u8; 3200], 16_000);

        let start = Instant::now();
        for _ in 0..TURN_ITERATIONS {
            black_box(controller.handle(TurnInput::SpeechStarted));
            black_box(controller.handle(TurnInput::SpeechEnded {
                audio: clip.clone(),
            }));
            let turn = controller.current_turn().unwrap();
            black_box(controller.handle(TurnInput::TranscriptReady {
                turn,
                transcript: Transcript {
                    text: "what's the weather like".to_string(),
                    confidence: 0.93,
                },
            }));
            black_box(controller.handle(TurnInput::ResponseReady {
                turn,
                text: "Sunny and mild all afternoon.".to_string(),
            }));
            black_box(controller.handle(TurnInput::PlaybackFinished { turn }));
        }
        let elapsed = start.elapsed();

        let per_turn_ns = elapsed.as_nanos() / TURN_ITERATIONS as u128;
        println!(
            "Controller turn cycle:  {:.2?} total, {} ns/turn ({} turns)",
            elapsed,
            per_turn_ns,
            controller.turns_started(),
        );
    }

    // --- Energy VAD throughput ---
    {
        let mut vad = EnergyVad::new(VadParams::default(), 16_000);
        // Half a second loud, half a second quiet, 10 ms chunks.
        let loud: Vec<u8> = (0..160)
            .flat_map(|_| 28_000i16.to_le_bytes())
            .collect();
        let quiet = vec![0u8; 320];

        let start = Instant::now();
        for _ in 0..VAD_SECONDS {
            for _ in 0..50 {
                black_box(vad.process(&loud));
            }
            for _ in 0..50 {
                black_box(vad.process(&quiet));
            }
        }
        let elapsed = start.elapsed();

        let per_second_us = elapsed.as_micros() / VAD_SECONDS as u128;
        println!(
            "Energy VAD:             {:.2?} total, {} us per second of audio",
            elapsed, per_second_us,
        );
    }

    // --- Voice request build with frame attach ---
    {
        let augmenter =
            ContextAugmenter::new(AttachPolicy::VisualKeywords, Duration::from_secs(2));
        let mut chat = ChatContext::with_system_prompt("You are a helpful assistant.");
        chat.add_user_message("hi there");
        chat.add_assistant_message("Hello! How can I help?");
        let mut frames = FrameStore::new();
        // A frame about the size of a small webcam JPEG.
        frames.update(CapturedFrame::new(
            Bytes::from(vec![0xabu8; 48 * 1024]),
            "image/jpeg",
        ));

        let start = Instant::now();
        for _ in 0..AUGMENT_ITERATIONS {
            black_box(augmenter.build_voice_request(
                &chat,
                "what am I holding in this picture",
                true,
                &frames,
            ));
        }
        let elapsed = start.elapsed();

        let per_request_us = elapsed.as_micros() / AUGMENT_ITERATIONS as u128;
        println!(
            "Request with 48K frame: {:.2?} total, {} us/request",
            elapsed, per_request_us,
        );
    }

    println!("\nDone.");
}
