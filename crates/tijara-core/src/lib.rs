// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tijara response engine.
//!
//! This crate provides the error taxonomy, identifiers, shared data model,
//! and the collaborator traits the rest of the workspace is written against.

pub mod error;
pub mod records;
pub mod traits;
pub mod types;

pub use error::TijaraError;
pub use records::{
    ConflictReport, ConflictType, PatternPerformance, PatternUsageRecord, Severity,
    StoredPattern, Trend,
};
pub use types::{
    ApiKey, Completion, ConflictStrategy, ConversationId, CredentialId, CustomerId, Interaction,
    ModelCredential, OrderDraft, OrderReceipt, PatternId, Priority, PrioritySettings,
    ProductMention, QuotaViolation, RankedSnippet, TenantId, TokenUsage, WindowLimits,
};

pub use traits::{
    CompletionProvider, MemoryStore, OrderService, PatternRepository, Retriever,
    TenantConfigStore,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tijara_error_has_all_variants() {
        let _config = TijaraError::Config("test".into());
        let _storage = TijaraError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _provider = TijaraError::Provider {
            message: "test".into(),
            source: None,
        };
        let _exhausted = TijaraError::PoolExhausted {
            tenant_id: "t1".into(),
        };
        let _timeout = TijaraError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = TijaraError::Internal("test".into());
    }

    #[test]
    fn traits_are_object_safe() {
        fn _memory(_: &dyn MemoryStore) {}
        fn _retriever(_: &dyn Retriever) {}
        fn _provider(_: &dyn CompletionProvider) {}
        fn _orders(_: &dyn OrderService) {}
        fn _tenant(_: &dyn TenantConfigStore) {}
        fn _patterns(_: &dyn PatternRepository) {}
    }
}
