// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat orchestration for Astra.
//!
//! [`manager::ChatManager`] owns the session list and streams assistant
//! replies into the active conversation; [`tts::TtsController`] turns a
//! finished message into audible playback.

pub mod audio;
pub mod manager;
pub mod parse;
pub mod title;
pub mod tts;

pub use manager::{ChatManager, SendOptions};
pub use tts::{AudioSink, TtsController, TtsState};
