// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gemini gateway for Astra.
//!
//! Implements [`astra_core::ChatGateway`] on top of the Generative Language
//! REST API: streaming chat with optional search grounding, image
//! generation and editing, and speech synthesis.

pub mod classify;
pub mod client;
pub mod gateway;
pub mod sse;
pub mod types;

pub use client::GeminiClient;
pub use gateway::GeminiGateway;
