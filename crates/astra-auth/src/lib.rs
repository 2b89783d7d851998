// SPDX-FileCopyrightText: 2026 Astra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auth gate for the Astra chat assistant.
//!
//! Accounts are local records with an obfuscated password marker; there is
//! no server. The gate validates credentials and maintains the active
//! session record in the persistent store.

pub mod gate;
pub mod obfuscate;

pub use gate::{AuthGate, ProfileUpdate};
