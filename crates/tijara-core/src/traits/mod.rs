// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the response engine.
//!
//! Every collaborator lives outside the core (databases, RAG, provider
//! HTTP, order persistence). All traits use `#[async_trait]` for dynamic
//! dispatch and take an explicit `&TenantId` on every tenant-scoped call.

pub mod memory;
pub mod order;
pub mod patterns;
pub mod provider;
pub mod retriever;
pub mod tenant;

pub use memory::MemoryStore;
pub use order::OrderService;
pub use patterns::PatternRepository;
pub use provider::CompletionProvider;
pub use retriever::Retriever;
pub use tenant::TenantConfigStore;
