// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Multi-turn order flows driven through the public API only.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tijara_config::model::OrdersConfig;
use tijara_core::{
    Interaction, OrderDraft, OrderReceipt, OrderService, ProductMention, TenantId, TijaraError,
};
use tijara_orders::{OrderDecision, OrderField, OrderIntentMachine, OrderState};

#[derive(Default)]
struct RecordingOrders {
    drafts: Mutex<Vec<(OrderDraft, TenantId)>>,
}

#[async_trait]
impl OrderService for RecordingOrders {
    async fn create(&self, draft: &OrderDraft, tenant_id: &TenantId) -> Result<OrderReceipt, TijaraError> {
        let mut drafts = self.drafts.lock().unwrap();
        drafts.push((draft.clone(), tenant_id.clone()));
        Ok(OrderReceipt {
            order_number: format!("ORD-{}", drafts.len()),
            total: draft.price.unwrap_or_default() * f64::from(draft.quantity),
        })
    }
}

/// Replays turns the way the orchestrator stores them: the decision's marker
/// becomes the stored intent.
struct Conversation {
    tenant: TenantId,
    history: Vec<Interaction>,
}

impl Conversation {
    fn new(tenant: &str) -> Self {
        Self {
            tenant: TenantId::new(tenant).unwrap(),
            history: Vec::new(),
        }
    }

    fn push(&mut self, user: &str, intent: &str, product: Option<ProductMention>) {
        self.history.push(Interaction {
            conversation_id: "conv-1".into(),
            customer_id: "cust-1".into(),
            tenant_id: self.tenant.clone(),
            user_message: user.into(),
            ai_response: "…".into(),
            intent: intent.into(),
            sentiment: 0.1,
            confidence: 0.8,
            processing_time_ms: 5,
            model_used: None,
            mentioned_products: product.into_iter().collect(),
            created_at: Utc::now(),
        });
    }

    async fn say(&mut self, machine: &OrderIntentMachine, message: &str) -> OrderDecision {
        let decision = machine
            .evaluate(&self.tenant, &self.history, message)
            .await
            .unwrap();
        let intent = decision.marker().unwrap_or("general");
        self.push(message, intent, None);
        decision
    }
}

fn sneaker() -> ProductMention {
    ProductMention {
        name: "Runner X".into(),
        variant: Some("white 42".into()),
        price: Some(900.0),
    }
}

#[tokio::test]
async fn full_address_flow_collects_over_three_turns() {
    let orders = Arc::new(RecordingOrders::default());
    let config = OrdersConfig {
        required_fields: vec![
            "customer_name".into(),
            "customer_phone".into(),
            "customer_address".into(),
            "city".into(),
        ],
        ..OrdersConfig::default()
    };
    let machine = OrderIntentMachine::new(orders.clone(), &config);

    let mut conv = Conversation::new("shop-7");
    conv.push("عندكم رانر ابيض؟", "product_inquiry", Some(sneaker()));

    let first = conv.say(&machine, "تمام عايز 2 قطعة").await;
    let OrderDecision::RequestData { missing, .. } = &first else {
        panic!("expected data request, got {first:?}");
    };
    assert_eq!(missing.len(), 4);
    assert_eq!(OrderState::from_history(&conv.history), OrderState::CollectingData);

    let second = conv.say(&machine, "اسمي منى حسن ورقمي 01012345678").await;
    let OrderDecision::RequestData { missing, .. } = &second else {
        panic!("expected data request, got {second:?}");
    };
    assert_eq!(missing, &vec![OrderField::CustomerAddress, OrderField::City]);

    let third = conv
        .say(&machine, "عنواني 12 شارع النصر، مدينة نصر\nالقاهرة")
        .await;
    let OrderDecision::Created { receipt, draft, .. } = &third else {
        panic!("expected created, got {third:?}");
    };
    assert_eq!(receipt.order_number, "ORD-1");
    assert_eq!(draft.quantity, 2);
    assert!((receipt.total - 1800.0).abs() < f64::EPSILON);
    assert_eq!(draft.customer_name.as_deref(), Some("منى حسن"));
    assert_eq!(draft.city.as_deref(), Some("القاهرة"));
    assert!((draft.confidence - 1.0).abs() < 1e-6);

    // The flow is over; another "تمام" starts nothing without a fresh product.
    assert_eq!(OrderState::from_history(&conv.history), OrderState::None);
    let drafts = orders.drafts.lock().unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].1.as_str(), "shop-7");
}

#[tokio::test]
async fn product_outside_lookback_is_not_ordered() {
    let orders = Arc::new(RecordingOrders::default());
    let config = OrdersConfig {
        product_lookback_turns: 2,
        ..OrdersConfig::default()
    };
    let machine = OrderIntentMachine::new(orders.clone(), &config);

    let mut conv = Conversation::new("shop-7");
    conv.push("عندكم رانر؟", "product_inquiry", Some(sneaker()));
    conv.push("الشحن بكام؟", "shipping", None);
    conv.push("بتوصلوا امتى؟", "shipping", None);

    let decision = conv.say(&machine, "تمام").await;
    assert_eq!(decision, OrderDecision::NotAnOrder);
    assert!(orders.drafts.lock().unwrap().is_empty());
}
