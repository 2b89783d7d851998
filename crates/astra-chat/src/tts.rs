// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-to-speech playback controller.
//!
//! One message may be audible at a time. The controller walks
//! `idle -> loading -> playing <-> paused -> idle`; starting a different
//! message stops the current one first, and re-starting the active message
//! toggles play/pause instead of re-fetching audio. Failures reset to idle
//! and never propagate to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::warn;

use astra_core::{AstraError, ChatGateway, MessageId};

use crate::audio::{TTS_SAMPLE_RATE, pcm_to_wav};

/// Playback phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

/// Audio output seam. Implementations own the single playback resource;
/// `play` replaces whatever was last handed over.
pub trait AudioSink: Send + Sync {
    fn play(&self, wav: Vec<u8>) -> Result<(), AstraError>;
    fn pause(&self);
    fn resume(&self);
    fn stop(&self);
    fn seek(&self, seconds: f64);
}

#[derive(Default)]
struct Playback {
    state: TtsState,
    message: Option<MessageId>,
}

/// Drives speech synthesis and playback for chat messages.
pub struct TtsController {
    gateway: Arc<dyn ChatGateway>,
    sink: Arc<dyn AudioSink>,
    playback: Mutex<Playback>,
    generation: AtomicU64,
}

impl TtsController {
    pub fn new(gateway: Arc<dyn ChatGateway>, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            gateway,
            sink,
            playback: Mutex::new(Playback::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Current phase and the message it applies to.
    pub fn state(&self) -> (TtsState, Option<MessageId>) {
        let playback = self.playback.lock().unwrap_or_else(|e| e.into_inner());
        (playback.state, playback.message.clone())
    }

    /// Starts (or toggles) playback of `text` for `message_id`.
    ///
    /// Never returns an error: synthesis or playback failures are logged
    /// and reset the controller to idle.
    pub async fn start(&self, text: &str, message_id: &MessageId) {
        let my_generation;
        {
            let mut playback = self.playback.lock().unwrap_or_else(|e| e.into_inner());
            if playback.message.as_ref() == Some(message_id) {
                match playback.state {
                    TtsState::Playing => {
                        self.sink.pause();
                        playback.state = TtsState::Paused;
                        return;
                    }
                    TtsState::Paused => {
                        self.sink.resume();
                        playback.state = TtsState::Playing;
                        return;
                    }
                    TtsState::Loading => return,
                    // After a natural end the same message loads afresh.
                    TtsState::Idle => {}
                }
            } else if playback.state != TtsState::Idle {
                self.sink.stop();
            }
            my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *playback = Playback {
                state: TtsState::Loading,
                message: Some(message_id.clone()),
            };
        }

        match self.gateway.synthesize_speech(text).await {
            Ok(pcm) => {
                let mut playback = self.playback.lock().unwrap_or_else(|e| e.into_inner());
                if self.generation.load(Ordering::SeqCst) != my_generation {
                    return;
                }
                let wav = pcm_to_wav(&pcm, TTS_SAMPLE_RATE);
                match self.sink.play(wav) {
                    Ok(()) => playback.state = TtsState::Playing,
                    Err(error) => {
                        warn!(error = %error, "audio playback failed");
                        *playback = Playback::default();
                    }
                }
            }
            Err(error) => {
                warn!(error = %error, "speech synthesis failed");
                let mut playback = self.playback.lock().unwrap_or_else(|e| e.into_inner());
                if self.generation.load(Ordering::SeqCst) != my_generation {
                    return;
                }
                *playback = Playback::default();
            }
        }
    }

    /// Stops playback and abandons any in-flight synthesis.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.sink.stop();
        let mut playback = self.playback.lock().unwrap_or_else(|e| e.into_inner());
        *playback = Playback::default();
    }

    /// Seeks within the active playback; ignored when idle or loading.
    pub fn seek(&self, seconds: f64) {
        let playback = self.playback.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(playback.state, TtsState::Playing | TtsState::Paused) {
            self.sink.seek(seconds);
        }
    }

    /// Sink callback for when playback reaches the end of the audio.
    pub fn on_playback_ended(&self) {
        let mut playback = self.playback.lock().unwrap_or_else(|e| e.into_inner());
        if playback.state == TtsState::Playing {
            *playback = Playback::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astra_test_utils::MockGateway;

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
        fail_play: bool,
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AudioSink for RecordingSink {
        fn play(&self, wav: Vec<u8>) -> Result<(), AstraError> {
            self.calls.lock().unwrap().push(format!("play:{}", wav.len()));
            if self.fail_play {
                Err(AstraError::Unknown("sink refused".into()))
            } else {
                Ok(())
            }
        }
        fn pause(&self) {
            self.calls.lock().unwrap().push("pause".into());
        }
        fn resume(&self) {
            self.calls.lock().unwrap().push("resume".into());
        }
        fn stop(&self) {
            self.calls.lock().unwrap().push("stop".into());
        }
        fn seek(&self, seconds: f64) {
            self.calls.lock().unwrap().push(format!("seek:{seconds}"));
        }
    }

    fn controller() -> (TtsController, Arc<RecordingSink>, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::new());
        let sink = Arc::new(RecordingSink::default());
        let controller = TtsController::new(gateway.clone(), sink.clone());
        (controller, sink, gateway)
    }

    #[tokio::test]
    async fn start_synthesizes_and_plays_wav() {
        let (controller, sink, _) = controller();
        let id = MessageId::generate();

        controller.start("read me", &id).await;

        let (state, active) = controller.state();
        assert_eq!(state, TtsState::Playing);
        assert_eq!(active, Some(id));
        // Mock PCM is 4800 bytes; WAV adds the 44-byte header.
        assert_eq!(sink.calls(), vec!["play:4844"]);
    }

    #[tokio::test]
    async fn same_message_toggles_pause_and_resume() {
        let (controller, sink, _) = controller();
        let id = MessageId::generate();

        controller.start("read me", &id).await;
        controller.start("read me", &id).await;
        assert_eq!(controller.state().0, TtsState::Paused);
        controller.start("read me", &id).await;
        assert_eq!(controller.state().0, TtsState::Playing);

        // Only the first call fetched audio.
        let plays = sink
            .calls()
            .iter()
            .filter(|call| call.starts_with("play"))
            .count();
        assert_eq!(plays, 1);
    }

    #[tokio::test]
    async fn different_message_stops_the_previous_one_first() {
        let (controller, sink, _) = controller();
        let first = MessageId::generate();
        let second = MessageId::generate();

        controller.start("first", &first).await;
        controller.start("second", &second).await;

        let calls = sink.calls();
        let stop_at = calls.iter().position(|c| c == "stop").unwrap();
        let second_play = calls
            .iter()
            .rposition(|c| c.starts_with("play"))
            .unwrap();
        assert!(stop_at < second_play);
        assert_eq!(controller.state().1, Some(second));
    }

    #[tokio::test]
    async fn synthesis_failure_resets_to_idle() {
        let (controller, sink, gateway) = controller();
        gateway
            .push_speech_error(AstraError::ServiceUnavailable("HTTP 503".into()))
            .await;

        controller.start("read me", &MessageId::generate()).await;

        assert_eq!(controller.state(), (TtsState::Idle, None));
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn playback_failure_resets_to_idle() {
        let gateway = Arc::new(MockGateway::new());
        let sink = Arc::new(RecordingSink {
            fail_play: true,
            ..RecordingSink::default()
        });
        let controller = TtsController::new(gateway, sink);

        controller.start("read me", &MessageId::generate()).await;
        assert_eq!(controller.state(), (TtsState::Idle, None));
    }

    #[tokio::test]
    async fn natural_end_allows_a_fresh_start() {
        let (controller, sink, _) = controller();
        let id = MessageId::generate();

        controller.start("read me", &id).await;
        controller.on_playback_ended();
        assert_eq!(controller.state(), (TtsState::Idle, None));

        controller.start("read me", &id).await;
        assert_eq!(controller.state().0, TtsState::Playing);
        let plays = sink
            .calls()
            .iter()
            .filter(|call| call.starts_with("play"))
            .count();
        assert_eq!(plays, 2);
    }

    #[tokio::test]
    async fn seek_is_ignored_while_idle() {
        let (controller, sink, _) = controller();
        controller.seek(3.5);
        assert!(sink.calls().is_empty());

        let id = MessageId::generate();
        controller.start("read me", &id).await;
        controller.seek(3.5);
        assert!(sink.calls().contains(&"seek:3.5".to_string()));
    }

    #[tokio::test]
    async fn stop_clears_state() {
        let (controller, sink, _) = controller();
        controller.start("read me", &MessageId::generate()).await;
        controller.stop();
        assert_eq!(controller.state(), (TtsState::Idle, None));
        assert!(sink.calls().contains(&"stop".to_string()));
    }
}
