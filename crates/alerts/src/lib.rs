//! `stockwatch-alerts`
//!
//! **Responsibility:** inventory alert evaluation and notification.
//!
//! - The evaluator is pure: (product, today, window) in, conditions out.
//! - Storage and mail delivery are reached only through the
//!   [`ProductRepository`] and [`MailTransport`] traits; adapters live in infra.
//! - A sweep never fails because of one product or one notification. Only a
//!   repository that cannot be read aborts it.

pub mod condition;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod ledger;
pub mod repository;
pub mod summary;
pub mod sweep;

pub use condition::{AlertCondition, AlertKind, ProductRef};
pub use dispatch::{
    DispatcherConfig, Envelope, MailTransport, Notification, NotificationDispatcher,
    RecipientResolver, StaticRecipients,
};
pub use error::{RepositoryError, SweepError, TransportError};
pub use evaluator::{ExpiryWindow, evaluate, evaluate_all};
pub use ledger::AlertLedger;
pub use repository::{ProductFilter, ProductRepository, ProductScan, UndecodableRecord};
pub use summary::{AlertRunSummary, MalformedProduct, NotificationResult};
pub use sweep::{AlertSweep, SweepChecks, run_alert_sweep};
