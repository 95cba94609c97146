// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tijara integration tests.
//!
//! Provides in-memory collaborators and a harness that drives the full
//! turn pipeline without external services.
//!
//! # Components
//!
//! - [`ScriptedProvider`] - completion provider with queued replies and
//!   per-model rate limiting
//! - [`InMemoryMemory`], [`StaticRetriever`], [`InMemoryTenantConfig`],
//!   [`InMemoryPatternRepository`], [`RecordingOrderService`] - collaborators
//! - [`TestHarness`] - a running engine wired to all of the above

pub mod collaborators;
pub mod harness;
pub mod mock_provider;

pub use collaborators::{
    InMemoryMemory, InMemoryPatternRepository, InMemoryTenantConfig, RecordingOrderService,
    StaticRetriever, stored_pattern,
};
pub use harness::{Stores, TEST_TENANT, TestHarness, TestHarnessBuilder, scripted_credential};
pub use mock_provider::{ProviderCall, SCRIPTED_PROVIDER, ScriptStep, ScriptedProvider};
