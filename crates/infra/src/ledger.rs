//! In-process alert ledger.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;

use stockwatch_alerts::{AlertKind, AlertLedger};
use stockwatch_core::ProductId;

/// Ledger kept in memory; it lasts as long as the process (e.g. one `watch` run).
#[derive(Debug, Default)]
pub struct InMemoryAlertLedger {
    inner: RwLock<HashMap<(ProductId, AlertKind), NaiveDate>>,
}

impl InMemoryAlertLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertLedger for InMemoryAlertLedger {
    fn last_alerted(&self, product: ProductId, kind: AlertKind) -> Option<NaiveDate> {
        let map = self.inner.read().ok()?;
        map.get(&(product, kind)).copied()
    }

    fn record(&self, product: ProductId, kind: AlertKind, on: NaiveDate) {
        if let Ok(mut map) = self.inner.write() {
            let entry = map.entry((product, kind)).or_insert(on);
            if on > *entry {
                *entry = on;
            }
        }
    }
}
