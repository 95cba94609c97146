// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order state derived from conversation memory.
//!
//! The state is never held in process. Each order turn stores a marker in
//! its interaction's `intent`, and the next turn (on any worker) reads the
//! state back from the most recent interaction.

use strum::{Display, EnumString};
use tijara_core::Interaction;

/// Memory marker: the turn asked the customer for missing fields.
pub const MARKER_COLLECTING: &str = "order_collecting";
/// Memory marker: fields were complete but the order service failed.
pub const MARKER_PENDING: &str = "order_pending";
/// Memory marker: the order was created.
pub const MARKER_CREATED: &str = "order_created";
/// Memory marker: the customer backed out of an order in progress.
pub const MARKER_CANCELLED: &str = "order_cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    None,
    Confirming,
    CollectingData,
    Ready,
}

impl OrderState {
    /// State a conversation is in after its most recent turn.
    pub fn from_history(history: &[Interaction]) -> Self {
        match history.last().map(|i| i.intent.as_str()) {
            Some(MARKER_COLLECTING) => OrderState::CollectingData,
            Some(MARKER_PENDING) => OrderState::Ready,
            _ => OrderState::None,
        }
    }

    pub fn marker(self) -> Option<&'static str> {
        match self {
            OrderState::CollectingData => Some(MARKER_COLLECTING),
            OrderState::Ready => Some(MARKER_PENDING),
            OrderState::None | OrderState::Confirming => None,
        }
    }
}

/// Number of trailing interactions that belong to the order in progress.
pub fn order_turns(history: &[Interaction]) -> usize {
    history
        .iter()
        .rev()
        .take_while(|i| i.intent == MARKER_COLLECTING || i.intent == MARKER_PENDING)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tijara_core::TenantId;

    fn turn(intent: &str) -> Interaction {
        Interaction {
            conversation_id: "c1".into(),
            customer_id: "u1".into(),
            tenant_id: TenantId::new("t1").unwrap(),
            user_message: "msg".into(),
            ai_response: "reply".into(),
            intent: intent.into(),
            sentiment: 0.0,
            confidence: 0.9,
            processing_time_ms: 10,
            model_used: None,
            mentioned_products: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn state_follows_last_marker() {
        assert_eq!(OrderState::from_history(&[]), OrderState::None);
        assert_eq!(
            OrderState::from_history(&[turn("greeting"), turn(MARKER_COLLECTING)]),
            OrderState::CollectingData
        );
        assert_eq!(
            OrderState::from_history(&[turn(MARKER_COLLECTING), turn(MARKER_PENDING)]),
            OrderState::Ready
        );
        assert_eq!(
            OrderState::from_history(&[turn(MARKER_COLLECTING), turn(MARKER_CREATED)]),
            OrderState::None
        );
    }

    #[test]
    fn order_turns_counts_trailing_markers() {
        let history = [
            turn(MARKER_COLLECTING),
            turn(MARKER_CREATED),
            turn("product_inquiry"),
            turn(MARKER_COLLECTING),
            turn(MARKER_PENDING),
        ];
        assert_eq!(order_turns(&history), 2);
        assert_eq!(OrderState::CollectingData.to_string(), "COLLECTING_DATA");
    }
}
