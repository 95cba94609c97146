// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Google Gemini provider for the Tijara model pool.

pub mod client;
pub mod types;

pub use client::GeminiProvider;
