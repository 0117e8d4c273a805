use std::sync::Arc;

use chrono::NaiveDate;

use stockwatch_core::ProductId;

use crate::condition::AlertKind;

/// Memory of when a product last triggered a delivered alert of a given kind.
///
/// Without a ledger every sweep re-sends every condition that still holds.
/// With one, a sweep skips conditions already delivered on the same day.
pub trait AlertLedger: Send + Sync {
    fn last_alerted(&self, product: ProductId, kind: AlertKind) -> Option<NaiveDate>;

    fn record(&self, product: ProductId, kind: AlertKind, on: NaiveDate);

    fn alerted_on(&self, product: ProductId, kind: AlertKind, day: NaiveDate) -> bool {
        self.last_alerted(product, kind) == Some(day)
    }
}

impl<L> AlertLedger for Arc<L>
where
    L: AlertLedger + ?Sized,
{
    fn last_alerted(&self, product: ProductId, kind: AlertKind) -> Option<NaiveDate> {
        (**self).last_alerted(product, kind)
    }

    fn record(&self, product: ProductId, kind: AlertKind, on: NaiveDate) {
        (**self).record(product, kind, on)
    }
}
