// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order intent detection for Tijara conversations.
//!
//! Detects when a customer confirms a purchase, gathers the required order
//! fields across turns, and calls the tenant's order service once the draft
//! is complete. Conversation memory is the only state.

pub mod confirm;
pub mod extract;
pub mod fields;
pub mod machine;
pub mod state;

pub use confirm::{Confirmation, classify_confirmation, is_cancellation, is_confirmation};
pub use extract::{ExtractedFields, extract_fields, find_product};
pub use fields::{OrderField, completeness};
pub use machine::{OrderDecision, OrderIntentMachine};
pub use state::{
    MARKER_CANCELLED, MARKER_COLLECTING, MARKER_CREATED, MARKER_PENDING, OrderState, order_turns,
};
