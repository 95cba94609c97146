// SPDX-FileCopyrightText: 2026 Tijara Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order draft fields.

use strum::{Display, EnumIter, IntoEnumIterator};
use tijara_core::OrderDraft;

/// A field of an [`OrderDraft`] that can be missing.
///
/// `Display` gives the machine name (`customerPhone`); [`OrderField::label`]
/// gives the customer-facing Arabic label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum OrderField {
    ProductName,
    CustomerName,
    CustomerPhone,
    CustomerAddress,
    City,
}

impl OrderField {
    /// Parses the snake_case names used in configuration.
    pub fn from_config_key(key: &str) -> Option<Self> {
        match key {
            "product_name" => Some(Self::ProductName),
            "customer_name" => Some(Self::CustomerName),
            "customer_phone" => Some(Self::CustomerPhone),
            "customer_address" => Some(Self::CustomerAddress),
            "city" => Some(Self::City),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ProductName => "اسم المنتج",
            Self::CustomerName => "الاسم",
            Self::CustomerPhone => "رقم الموبايل",
            Self::CustomerAddress => "العنوان بالتفصيل",
            Self::City => "المدينة",
        }
    }

    pub fn value(self, draft: &OrderDraft) -> Option<&str> {
        let value = match self {
            Self::ProductName => &draft.product_name,
            Self::CustomerName => &draft.customer_name,
            Self::CustomerPhone => &draft.customer_phone,
            Self::CustomerAddress => &draft.customer_address,
            Self::City => &draft.city,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    pub fn is_filled(self, draft: &OrderDraft) -> bool {
        self.value(draft).is_some()
    }
}

/// Fraction of all fields that are filled.
pub fn completeness(draft: &OrderDraft) -> f32 {
    let total = OrderField::iter().count();
    let filled = OrderField::iter().filter(|f| f.is_filled(draft)).count();
    filled as f32 / total as f32
}
