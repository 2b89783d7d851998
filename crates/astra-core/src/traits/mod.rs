// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the session layer and its external collaborators.

pub mod gateway;
pub mod store;

pub use gateway::{ChatGateway, ChatStream};
pub use store::KeyValueStore;
