// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for Astra integration tests: a scripted gateway and an
//! in-memory key-value store.

pub mod memory_store;
pub mod mock_gateway;

pub use memory_store::MemoryStore;
pub use mock_gateway::{ChatScript, MockGateway, RecordedChat};
