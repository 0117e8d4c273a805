use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockwatch_core::ProductId;
use stockwatch_products::ValidProduct;

/// Snapshot of the product fields a notification needs.
///
/// Conditions are transient, so they carry a copy rather than borrowing the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: ProductId,
    pub name: String,
    pub reorder_level: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
}

impl From<&ValidProduct> for ProductRef {
    fn from(p: &ValidProduct) -> Self {
        Self {
            id: p.id(),
            name: p.name().to_string(),
            reorder_level: p.reorder_level(),
            expiry_date: p.expiry_date(),
            category: p.category_name().map(str::to_string),
            supplier: p.supplier_name().map(str::to_string),
        }
    }
}

/// Payload-free discriminant of [`AlertCondition`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    LowStock,
    Expiring,
    Expired,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::LowStock => "low_stock",
            AlertKind::Expiring => "expiring",
            AlertKind::Expired => "expired",
        }
    }

    pub fn is_expiry(&self) -> bool {
        matches!(self, AlertKind::Expiring | AlertKind::Expired)
    }
}

impl core::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold crossed by one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertCondition {
    LowStock {
        product: ProductRef,
        current_quantity: u64,
    },
    Expiring {
        product: ProductRef,
        days_remaining: u32,
    },
    Expired {
        product: ProductRef,
    },
}

impl AlertCondition {
    pub fn kind(&self) -> AlertKind {
        match self {
            AlertCondition::LowStock { .. } => AlertKind::LowStock,
            AlertCondition::Expiring { .. } => AlertKind::Expiring,
            AlertCondition::Expired { .. } => AlertKind::Expired,
        }
    }

    pub fn product(&self) -> &ProductRef {
        match self {
            AlertCondition::LowStock { product, .. }
            | AlertCondition::Expiring { product, .. }
            | AlertCondition::Expired { product } => product,
        }
    }
}
