//! One complete alert pass over the product store.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::condition::AlertCondition;
use crate::dispatch::NotificationDispatcher;
use crate::error::SweepError;
use crate::evaluator::{ExpiryWindow, evaluate};
use crate::ledger::AlertLedger;
use crate::repository::{ProductFilter, ProductRepository};
use crate::summary::AlertRunSummary;

/// Which rule families a sweep applies.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SweepChecks {
    pub low_stock: bool,
    pub expiry: bool,
}

impl SweepChecks {
    pub fn all() -> Self {
        Self {
            low_stock: true,
            expiry: true,
        }
    }

    pub fn low_stock_only() -> Self {
        Self {
            low_stock: true,
            expiry: false,
        }
    }

    pub fn expiry_only() -> Self {
        Self {
            low_stock: false,
            expiry: true,
        }
    }

    fn allows(&self, condition: &AlertCondition) -> bool {
        if condition.kind().is_expiry() {
            self.expiry
        } else {
            self.low_stock
        }
    }
}

impl Default for SweepChecks {
    fn default() -> Self {
        Self::all()
    }
}

/// Alert run orchestrator.
///
/// Stateless across runs unless an [`AlertLedger`] is attached. Callers must not
/// run two sweeps against the same recipients concurrently.
#[derive(Clone)]
pub struct AlertSweep {
    repository: Arc<dyn ProductRepository>,
    dispatcher: NotificationDispatcher,
    ledger: Option<Arc<dyn AlertLedger>>,
    checks: SweepChecks,
}

impl core::fmt::Debug for AlertSweep {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AlertSweep")
            .field("dispatcher", &self.dispatcher)
            .field("ledger", &self.ledger.is_some())
            .field("checks", &self.checks)
            .finish_non_exhaustive()
    }
}

impl AlertSweep {
    pub fn new(repository: Arc<dyn ProductRepository>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            repository,
            dispatcher,
            ledger: None,
            checks: SweepChecks::all(),
        }
    }

    pub fn with_ledger(mut self, ledger: Arc<dyn AlertLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn with_checks(mut self, checks: SweepChecks) -> Self {
        self.checks = checks;
        self
    }

    pub fn checks(&self) -> SweepChecks {
        self.checks
    }

    /// Evaluate every candidate product and dispatch each condition.
    ///
    /// Only a repository read failure is fatal. Malformed products and failed
    /// deliveries are recorded in the summary.
    pub fn run(&self, today: NaiveDate, window: ExpiryWindow) -> Result<AlertRunSummary, SweepError> {
        let filter =
            ProductFilter::alert_candidates(today, window, self.checks.low_stock, self.checks.expiry);

        let scan = self.repository.scan(&filter).map_err(|e| {
            warn!(error = %e, "cannot load products; alert sweep aborted");
            SweepError::from(e)
        })?;

        info!(
            %today,
            window_days = window.as_days(),
            candidates = scan.products.len(),
            undecodable = scan.undecodable.len(),
            "alert sweep started"
        );

        let mut summary = AlertRunSummary::new(today, window);
        summary.products_scanned = scan.products.len() + scan.undecodable.len();

        for record in scan.undecodable {
            warn!(product = ?record.product_id, reason = %record.reason, "skipping undecodable product");
            summary.record_malformed(record.product_id, record.reason);
        }

        for product in &scan.products {
            let valid = match product.validate() {
                Ok(v) => v,
                Err(e) => {
                    warn!(product = %product.id, error = %e, "skipping malformed product");
                    summary.record_malformed(Some(product.id), e.to_string());
                    continue;
                }
            };

            for condition in evaluate(&valid, today, window) {
                if !self.checks.allows(&condition) {
                    continue;
                }

                let kind = condition.kind();
                if let Some(ledger) = &self.ledger {
                    if ledger.alerted_on(valid.id(), kind, today) {
                        debug!(product = %valid.id(), %kind, "already alerted today; suppressed");
                        summary.record_suppressed();
                        continue;
                    }
                }

                let result = self.dispatcher.dispatch(&condition);
                if result.delivered {
                    if let Some(ledger) = &self.ledger {
                        ledger.record(valid.id(), kind, today);
                    }
                }
                summary.record(result);
            }
        }

        info!(
            low_stock_sent = summary.low_stock_sent,
            expiry_sent = summary.expiry_sent,
            failures = summary.failures,
            suppressed = summary.suppressed,
            "alert sweep finished"
        );

        Ok(summary)
    }
}

/// Run one sweep with every check enabled and no deduplication.
pub fn run_alert_sweep(
    repository: Arc<dyn ProductRepository>,
    dispatcher: NotificationDispatcher,
    today: NaiveDate,
    window: ExpiryWindow,
) -> Result<AlertRunSummary, SweepError> {
    AlertSweep::new(repository, dispatcher).run(today, window)
}
