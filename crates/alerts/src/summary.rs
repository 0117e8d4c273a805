use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockwatch_core::ProductId;

use crate::condition::{AlertCondition, AlertKind};
use crate::evaluator::ExpiryWindow;

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResult {
    pub condition: AlertCondition,
    pub delivered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationResult {
    pub fn delivered(condition: AlertCondition) -> Self {
        Self {
            condition,
            delivered: true,
            error: None,
        }
    }

    pub fn failed(condition: AlertCondition, error: impl Into<String>) -> Self {
        Self {
            condition,
            delivered: false,
            error: Some(error.into()),
        }
    }
}

/// A record skipped because it broke the stock invariants or could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MalformedProduct {
    /// Absent when the store could not read an id from the record.
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub reason: String,
}

/// Aggregated outcome of one sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRunSummary {
    pub today: NaiveDate,
    pub expiry_window_days: u32,
    pub products_scanned: usize,
    pub low_stock_sent: u64,
    pub expiry_sent: u64,
    /// Failed deliveries plus malformed products.
    pub failures: u64,
    /// Conditions skipped because they were already alerted today.
    pub suppressed: u64,
    pub results: Vec<NotificationResult>,
    pub malformed: Vec<MalformedProduct>,
}

impl AlertRunSummary {
    pub fn new(today: NaiveDate, window: ExpiryWindow) -> Self {
        Self {
            today,
            expiry_window_days: window.as_days(),
            products_scanned: 0,
            low_stock_sent: 0,
            expiry_sent: 0,
            failures: 0,
            suppressed: 0,
            results: Vec::new(),
            malformed: Vec::new(),
        }
    }

    pub fn record(&mut self, result: NotificationResult) {
        if result.delivered {
            match result.condition.kind() {
                AlertKind::LowStock => self.low_stock_sent += 1,
                AlertKind::Expiring | AlertKind::Expired => self.expiry_sent += 1,
            }
        } else {
            self.failures += 1;
        }
        self.results.push(result);
    }

    pub fn record_malformed(&mut self, product_id: Option<ProductId>, reason: impl Into<String>) {
        self.failures += 1;
        self.malformed.push(MalformedProduct {
            product_id,
            reason: reason.into(),
        });
    }

    pub fn record_suppressed(&mut self) {
        self.suppressed += 1;
    }

    pub fn delivered(&self) -> u64 {
        self.low_stock_sent + self.expiry_sent
    }

    pub fn has_failures(&self) -> bool {
        self.failures > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ProductRef;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn product_ref() -> ProductRef {
        ProductRef {
            id: ProductId::new(),
            name: "Item".to_string(),
            reorder_level: 5,
            expiry_date: None,
            category: None,
            supplier: None,
        }
    }

    #[test]
    fn new_summary_is_empty() {
        let summary = AlertRunSummary::new(today(), ExpiryWindow::default());
        assert_eq!(summary.delivered(), 0);
        assert_eq!(summary.failures, 0);
        assert_eq!(summary.expiry_window_days, 7);
        assert!(summary.results.is_empty());
    }

    #[test]
    fn record_counts_by_kind_and_outcome() {
        let mut summary = AlertRunSummary::new(today(), ExpiryWindow::default());

        summary.record(NotificationResult::delivered(AlertCondition::LowStock {
            product: product_ref(),
            current_quantity: 1,
        }));
        summary.record(NotificationResult::delivered(AlertCondition::Expired {
            product: product_ref(),
        }));
        summary.record(NotificationResult::delivered(AlertCondition::Expiring {
            product: product_ref(),
            days_remaining: 2,
        }));
        summary.record(NotificationResult::failed(
            AlertCondition::Expired {
                product: product_ref(),
            },
            "boom",
        ));
        summary.record_malformed(Some(ProductId::new()), "quantity must be >= 0 (got -1)");

        assert_eq!(summary.low_stock_sent, 1);
        assert_eq!(summary.expiry_sent, 2);
        assert_eq!(summary.failures, 2);
        assert_eq!(summary.results.len(), 4);
        assert_eq!(summary.malformed.len(), 1);
        assert!(summary.has_failures());
    }

    #[test]
    fn serializes_condition_with_kind_tag() {
        let result = NotificationResult::delivered(AlertCondition::Expiring {
            product: product_ref(),
            days_remaining: 3,
        });
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["condition"]["kind"], "expiring");
        assert_eq!(value["condition"]["days_remaining"], 3);
        assert!(value.get("error").is_none());
    }
}
