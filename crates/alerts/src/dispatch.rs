//! Notification rendering and delivery.
//!
//! Delivery failures are reported in the returned [`NotificationResult`] and
//! never raised. Dispatching the same condition twice sends two messages.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::condition::AlertCondition;
use crate::error::TransportError;
use crate::summary::NotificationResult;

/// Rendered message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
}

/// A fully addressed message handed to a [`MailTransport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Outgoing mail channel.
///
/// `Ok(())` means the transport accepted the message; what happens after the
/// hand-off is outside this crate.
pub trait MailTransport: Send + Sync {
    fn send(&self, envelope: &Envelope) -> Result<(), TransportError>;
}

impl<T> MailTransport for Arc<T>
where
    T: MailTransport + ?Sized,
{
    fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        (**self).send(envelope)
    }
}

/// Who should hear about a condition.
pub trait RecipientResolver: Send + Sync {
    fn recipients(&self, condition: &AlertCondition) -> Vec<String>;
}

/// Same recipient list for every condition (e.g. the configured staff list).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticRecipients(Vec<String>);

impl StaticRecipients {
    pub fn new<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(recipients.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl RecipientResolver for StaticRecipients {
    fn recipients(&self, _condition: &AlertCondition) -> Vec<String> {
        self.0.clone()
    }
}

/// Sender identity and subject decoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub from: String,
    pub subject_prefix: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            from: "inventory@localhost".to_string(),
            subject_prefix: "[Inventory] ".to_string(),
        }
    }
}

/// Renders conditions and sends them through a transport.
#[derive(Clone)]
pub struct NotificationDispatcher {
    config: DispatcherConfig,
    transport: Arc<dyn MailTransport>,
    recipients: Arc<dyn RecipientResolver>,
}

impl core::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn MailTransport>, recipients: Arc<dyn RecipientResolver>) -> Self {
        Self {
            config: DispatcherConfig::default(),
            transport,
            recipients,
        }
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Render and attempt delivery of one condition.
    pub fn dispatch(&self, condition: &AlertCondition) -> NotificationResult {
        let product = condition.product();
        let to = self.recipients.recipients(condition);
        if to.is_empty() {
            warn!(product = %product.id, kind = %condition.kind(), "no recipients configured; alert not sent");
            return NotificationResult::failed(condition.clone(), "no recipients configured");
        }

        let notification = render(condition);
        let envelope = Envelope {
            from: self.config.from.clone(),
            to,
            subject: format!("{}{}", self.config.subject_prefix, notification.subject),
            body: notification.body,
        };

        match self.transport.send(&envelope) {
            Ok(()) => {
                debug!(
                    product = %product.id,
                    kind = %condition.kind(),
                    recipients = envelope.to.len(),
                    "alert delivered to transport"
                );
                NotificationResult::delivered(condition.clone())
            }
            Err(e) => {
                warn!(product = %product.id, kind = %condition.kind(), error = %e, "alert delivery failed");
                NotificationResult::failed(condition.clone(), e.to_string())
            }
        }
    }
}

/// Human-readable message for a condition (subject without prefix).
pub fn render(condition: &AlertCondition) -> Notification {
    match condition {
        AlertCondition::LowStock {
            product,
            current_quantity,
        } => {
            let mut body = format!(
                "The product \"{}\" is running low on stock.\n\n\
                 Current quantity: {}\n\
                 Reorder level: {}\n",
                product.name, current_quantity, product.reorder_level
            );
            if let Some(category) = &product.category {
                body.push_str(&format!("Category: {category}\n"));
            }
            if let Some(supplier) = &product.supplier {
                body.push_str(&format!("Supplier: {supplier}\n"));
            }
            body.push_str("\nPlease reorder this product as soon as possible.\n");

            Notification {
                subject: format!("Low Stock Alert: {}", product.name),
                body,
            }
        }
        AlertCondition::Expiring {
            product,
            days_remaining,
        } => {
            let when = match days_remaining {
                0 => "today".to_string(),
                1 => "in 1 day".to_string(),
                n => format!("in {n} days"),
            };
            let mut body = format!("The product \"{}\" expires {when}.\n\n", product.name);
            if let Some(expiry_date) = product.expiry_date {
                body.push_str(&format!("Expiry date: {expiry_date}\n"));
            }
            body.push_str(&format!("Days remaining: {days_remaining}\n"));
            body.push_str("\nPlease sell or use this product before it expires.\n");

            Notification {
                subject: format!("Product Expiring Soon: {}", product.name),
                body,
            }
        }
        AlertCondition::Expired { product } => {
            let mut body = format!("The product \"{}\" has expired.\n\n", product.name);
            if let Some(expiry_date) = product.expiry_date {
                body.push_str(&format!("Expiry date: {expiry_date}\n"));
            }
            body.push_str("\nPlease remove this product from stock.\n");

            Notification {
                subject: format!("Expired Product Alert: {}", product.name),
                body,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use stockwatch_core::ProductId;

    use super::*;
    use crate::condition::ProductRef;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<Envelope>>,
    }

    impl MailTransport for RecordingTransport {
        fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(envelope.clone());
            Ok(())
        }
    }

    struct RejectingTransport;

    impl MailTransport for RejectingTransport {
        fn send(&self, _envelope: &Envelope) -> Result<(), TransportError> {
            Err(TransportError::Rejected("mailbox unavailable".to_string()))
        }
    }

    fn product_ref(name: &str) -> ProductRef {
        ProductRef {
            id: ProductId::new(),
            name: name.to_string(),
            reorder_level: 10,
            expiry_date: NaiveDate::from_ymd_opt(2024, 3, 18),
            category: Some("Dairy".to_string()),
            supplier: Some("Acme Foods".to_string()),
        }
    }

    fn low_stock(name: &str) -> AlertCondition {
        AlertCondition::LowStock {
            product: product_ref(name),
            current_quantity: 2,
        }
    }

    #[test]
    fn renders_low_stock_message() {
        let n = render(&low_stock("Milk"));
        assert_eq!(n.subject, "Low Stock Alert: Milk");
        assert!(n.body.contains("Current quantity: 2"));
        assert!(n.body.contains("Reorder level: 10"));
        assert!(n.body.contains("Supplier: Acme Foods"));
    }

    #[test]
    fn renders_expiry_messages() {
        let expiring = render(&AlertCondition::Expiring {
            product: product_ref("Yogurt"),
            days_remaining: 3,
        });
        assert_eq!(expiring.subject, "Product Expiring Soon: Yogurt");
        assert!(expiring.body.contains("expires in 3 days"));
        assert!(expiring.body.contains("Expiry date: 2024-03-18"));

        let today = render(&AlertCondition::Expiring {
            product: product_ref("Yogurt"),
            days_remaining: 0,
        });
        assert!(today.body.contains("expires today"));

        let expired = render(&AlertCondition::Expired {
            product: product_ref("Cheese"),
        });
        assert_eq!(expired.subject, "Expired Product Alert: Cheese");
        assert!(expired.body.contains("has expired"));
    }

    #[test]
    fn dispatch_addresses_and_prefixes_message() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = NotificationDispatcher::new(
            transport.clone(),
            Arc::new(StaticRecipients::new(["staff@example.com", "admin@example.com"])),
        );

        let result = dispatcher.dispatch(&low_stock("Milk"));
        assert!(result.delivered);
        assert_eq!(result.error, None);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "[Inventory] Low Stock Alert: Milk");
        assert_eq!(sent[0].from, "inventory@localhost");
        assert_eq!(sent[0].to, vec!["staff@example.com", "admin@example.com"]);
    }

    #[test]
    fn dispatch_is_not_idempotent() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher = NotificationDispatcher::new(
            transport.clone(),
            Arc::new(StaticRecipients::new(["staff@example.com"])),
        );

        let condition = low_stock("Milk");
        dispatcher.dispatch(&condition);
        dispatcher.dispatch(&condition);
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
    }

    #[test]
    fn transport_failure_is_recorded_not_raised() {
        let dispatcher = NotificationDispatcher::new(
            Arc::new(RejectingTransport),
            Arc::new(StaticRecipients::new(["staff@example.com"])),
        );

        let result = dispatcher.dispatch(&low_stock("Milk"));
        assert!(!result.delivered);
        assert_eq!(result.error.as_deref(), Some("message rejected: mailbox unavailable"));
    }

    #[test]
    fn missing_recipients_is_a_delivery_failure() {
        let transport = Arc::new(RecordingTransport::default());
        let dispatcher =
            NotificationDispatcher::new(transport.clone(), Arc::new(StaticRecipients::default()));

        let result = dispatcher.dispatch(&low_stock("Milk"));
        assert!(!result.delivered);
        assert_eq!(result.error.as_deref(), Some("no recipients configured"));
        assert!(transport.sent.lock().unwrap().is_empty());
    }
}
