//! Threshold rules for low stock and expiry.
//!
//! Rules:
//! - Low stock: `quantity <= reorder_level`, never when `reorder_level == 0`.
//! - Expiring: `0 <= expiry_date - today <= window` (days).
//! - Expired: `expiry_date < today`.
//!
//! A product without an expiry date never triggers an expiry condition.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockwatch_products::ValidProduct;

use crate::condition::{AlertCondition, ProductRef};

/// Lookahead, in days, within which an unexpired product counts as expiring.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpiryWindow(u32);

impl ExpiryWindow {
    pub const DEFAULT_DAYS: u32 = 7;

    pub fn days(days: u32) -> Self {
        Self(days)
    }

    pub fn as_days(&self) -> u32 {
        self.0
    }

    /// Last date still inside the window, relative to `today`.
    pub fn horizon(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_days(chrono::Days::new(u64::from(self.0)))
            .unwrap_or(NaiveDate::MAX)
    }
}

impl Default for ExpiryWindow {
    fn default() -> Self {
        Self(Self::DEFAULT_DAYS)
    }
}

impl core::fmt::Display for ExpiryWindow {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} day(s)", self.0)
    }
}

/// Conditions that hold for `product` on `today`.
///
/// Low stock comes first when both a stock and an expiry condition apply.
pub fn evaluate(product: &ValidProduct, today: NaiveDate, window: ExpiryWindow) -> Vec<AlertCondition> {
    let mut conditions = Vec::with_capacity(2);

    if let Some(c) = low_stock(product) {
        conditions.push(c);
    }
    if let Some(c) = expiry(product, today, window) {
        conditions.push(c);
    }

    conditions
}

/// Evaluate a batch of products, in order.
pub fn evaluate_all<'a, I>(products: I, today: NaiveDate, window: ExpiryWindow) -> Vec<AlertCondition>
where
    I: IntoIterator<Item = &'a ValidProduct>,
{
    products
        .into_iter()
        .flat_map(|p| evaluate(p, today, window))
        .collect()
}

pub(crate) fn low_stock(product: &ValidProduct) -> Option<AlertCondition> {
    let reorder_level = product.reorder_level();
    if reorder_level == 0 || product.quantity() > reorder_level {
        return None;
    }

    Some(AlertCondition::LowStock {
        product: ProductRef::from(product),
        current_quantity: product.quantity(),
    })
}

pub(crate) fn expiry(
    product: &ValidProduct,
    today: NaiveDate,
    window: ExpiryWindow,
) -> Option<AlertCondition> {
    let expiry_date = product.expiry_date()?;
    let days = (expiry_date - today).num_days();

    if days < 0 {
        return Some(AlertCondition::Expired {
            product: ProductRef::from(product),
        });
    }

    if days > i64::from(window.as_days()) {
        return None;
    }

    Some(AlertCondition::Expiring {
        product: ProductRef::from(product),
        // Bounded by the window, which is a u32.
        days_remaining: days as u32,
    })
}
