// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The order intent state machine.
//!
//! `NONE -> CONFIRMING -> COLLECTING_DATA -> READY -> NONE`. Each call
//! evaluates one customer turn against memory and returns a decision whose
//! marker the caller stores with the turn.

use std::sync::Arc;

use tijara_config::model::OrdersConfig;
use tijara_core::{Interaction, OrderDraft, OrderReceipt, OrderService, TenantId, TijaraError};
use tracing::{error, info, warn};

use crate::confirm::{Confirmation, classify_confirmation, is_cancellation};
use crate::extract::{ExtractedFields, extract_fields, find_product};
use crate::fields::{OrderField, completeness};
use crate::state::{MARKER_CANCELLED, MARKER_CREATED, OrderState, order_turns};

/// Outcome of evaluating one turn.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderDecision {
    /// Not an order turn; the normal response pipeline handles it.
    NotAnOrder,
    /// Required fields are missing; the reply asks for exactly those.
    RequestData {
        draft: OrderDraft,
        missing: Vec<OrderField>,
        reply: String,
    },
    Created {
        draft: OrderDraft,
        receipt: OrderReceipt,
        reply: String,
    },
    /// The order service failed. The draft stays pending and is retried on
    /// the customer's next turn.
    Failed {
        draft: OrderDraft,
        error: String,
        reply: String,
    },
    Cancelled { reply: String },
}

impl OrderDecision {
    /// Intent marker to store with the turn, which carries the state forward.
    pub fn marker(&self) -> Option<&'static str> {
        match self {
            OrderDecision::NotAnOrder => None,
            OrderDecision::RequestData { .. } => OrderState::CollectingData.marker(),
            OrderDecision::Failed { .. } => OrderState::Ready.marker(),
            OrderDecision::Created { .. } => Some(MARKER_CREATED),
            OrderDecision::Cancelled { .. } => Some(MARKER_CANCELLED),
        }
    }

    pub fn reply(&self) -> Option<&str> {
        match self {
            OrderDecision::NotAnOrder => None,
            OrderDecision::RequestData { reply, .. }
            | OrderDecision::Created { reply, .. }
            | OrderDecision::Failed { reply, .. }
            | OrderDecision::Cancelled { reply } => Some(reply),
        }
    }

    pub fn draft(&self) -> Option<&OrderDraft> {
        match self {
            OrderDecision::RequestData { draft, .. }
            | OrderDecision::Created { draft, .. }
            | OrderDecision::Failed { draft, .. } => Some(draft),
            OrderDecision::NotAnOrder | OrderDecision::Cancelled { .. } => None,
        }
    }

    /// Stable label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderDecision::NotAnOrder => "none",
            OrderDecision::RequestData { .. } => "data_requested",
            OrderDecision::Created { .. } => "created",
            OrderDecision::Failed { .. } => "failed",
            OrderDecision::Cancelled { .. } => "cancelled",
        }
    }
}

pub struct OrderIntentMachine {
    orders: Arc<dyn OrderService>,
    required: Vec<OrderField>,
    product_lookback: usize,
}

impl OrderIntentMachine {
    pub fn new(orders: Arc<dyn OrderService>, config: &OrdersConfig) -> Self {
        let mut required = vec![OrderField::ProductName];
        for key in &config.required_fields {
            match OrderField::from_config_key(key) {
                Some(field) if !required.contains(&field) => required.push(field),
                Some(_) => {}
                None => warn!(field = %key, "ignoring unknown required order field"),
            }
        }
        required.sort();
        Self {
            orders,
            required,
            product_lookback: config.product_lookback_turns,
        }
    }

    pub fn required_fields(&self) -> &[OrderField] {
        &self.required
    }

    /// Evaluates one customer message against conversation memory.
    ///
    /// Order-service failures are returned as [`OrderDecision::Failed`], not
    /// as errors, so the pending state is stored with the turn.
    pub async fn evaluate(
        &self,
        tenant_id: &TenantId,
        history: &[Interaction],
        message: &str,
    ) -> Result<OrderDecision, TijaraError> {
        let state = OrderState::from_history(history);
        let in_progress = order_turns(history);

        match state {
            OrderState::None => {
                // A bare "تمام" only confirms the product discussed in the
                // previous turn.
                let lookback = match classify_confirmation(message) {
                    None => return Ok(OrderDecision::NotAnOrder),
                    Some(Confirmation::Explicit) => self.product_lookback,
                    Some(Confirmation::Acknowledgement) => 1,
                };
                if find_product(history, lookback).is_none() {
                    return Ok(OrderDecision::NotAnOrder);
                }
                info!(tenant_id = %tenant_id, "order confirmation detected");
            }
            OrderState::CollectingData | OrderState::Ready => {
                if is_cancellation(message) {
                    info!(tenant_id = %tenant_id, from = %state, "order cancelled by customer");
                    return Ok(OrderDecision::Cancelled {
                        reply: "تمام، لغينا الطلب. لو احتجت أي حاجة تانية أنا موجود.".to_string(),
                    });
                }
            }
            OrderState::Confirming => {}
        }

        let draft = self.build_draft(history, in_progress, message);
        let missing: Vec<OrderField> = self
            .required
            .iter()
            .copied()
            .filter(|f| !f.is_filled(&draft))
            .collect();

        if !missing.is_empty() {
            metrics::counter!("tijara_orders_total", "outcome" => "data_requested").increment(1);
            return Ok(OrderDecision::RequestData {
                reply: data_request(&draft, &missing),
                draft,
                missing,
            });
        }

        match self.orders.create(&draft, tenant_id).await {
            Ok(receipt) => {
                metrics::counter!("tijara_orders_total", "outcome" => "created").increment(1);
                info!(
                    tenant_id = %tenant_id,
                    order_number = %receipt.order_number,
                    "order created"
                );
                Ok(OrderDecision::Created {
                    reply: confirmation(&draft, &receipt),
                    draft,
                    receipt,
                })
            }
            Err(e) => {
                metrics::counter!("tijara_orders_total", "outcome" => "failed").increment(1);
                error!(
                    tenant_id = %tenant_id,
                    error = %e,
                    product = ?draft.product_name,
                    "order service failed, order stays pending"
                );
                Ok(OrderDecision::Failed {
                    error: e.to_string(),
                    reply: "استلمنا بيانات طلبك وجاري تأكيده، هنبلغك أول ما يتسجل.".to_string(),
                    draft,
                })
            }
        }
    }

    /// Builds the draft from the order's turns plus the current message.
    ///
    /// A single message with every field and a confirm-then-supply sequence
    /// produce the same draft.
    fn build_draft(&self, history: &[Interaction], in_progress: usize, message: &str) -> OrderDraft {
        let mut fields = ExtractedFields::default();
        for turn in &history[history.len() - in_progress..] {
            fields.merge(extract_fields(&turn.user_message));
        }
        fields.merge(extract_fields(message));

        let product = find_product(history, self.product_lookback + in_progress);
        let mut draft = OrderDraft {
            product_name: product.as_ref().map(|p| p.name.clone()),
            variant: product.as_ref().and_then(|p| p.variant.clone()),
            price: product.as_ref().and_then(|p| p.price),
            quantity: fields.quantity.unwrap_or(1),
            customer_name: fields.customer_name,
            customer_phone: fields.customer_phone,
            customer_address: fields.customer_address,
            city: fields.city,
            confidence: 0.0,
        };
        draft.confidence = completeness(&draft);
        draft
    }
}

fn data_request(draft: &OrderDraft, missing: &[OrderField]) -> String {
    let labels: Vec<&str> = missing.iter().map(|f| f.label()).collect();
    match &draft.product_name {
        Some(product) => format!(
            "عشان نأكد طلب {product}، محتاجين من حضرتك: {}.",
            labels.join("، ")
        ),
        None => format!("عشان نأكد الطلب، محتاجين من حضرتك: {}.", labels.join("، ")),
    }
}

fn confirmation(draft: &OrderDraft, receipt: &OrderReceipt) -> String {
    let product = draft.product_name.as_deref().unwrap_or("طلبك");
    format!(
        "تم تسجيل طلب {product} برقم {} بإجمالي {:.2} جنيه. هنتواصل مع حضرتك لتأكيد الشحن.",
        receipt.order_number, receipt.total
    )
}
