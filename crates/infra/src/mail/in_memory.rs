use std::sync::Mutex;

use stockwatch_alerts::{Envelope, MailTransport, TransportError};

/// Captures envelopes instead of sending them (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<Envelope>>,
    fail_when_subject_contains: Option<String>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every message whose subject contains `needle`.
    pub fn failing_on(needle: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_when_subject_contains: Some(needle.into()),
        }
    }

    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl MailTransport for InMemoryTransport {
    fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        if let Some(needle) = &self.fail_when_subject_contains {
            if envelope.subject.contains(needle.as_str()) {
                return Err(TransportError::Rejected(format!(
                    "simulated failure for \"{}\"",
                    envelope.subject
                )));
            }
        }
        self.sent
            .lock()
            .map_err(|_| TransportError::Io("outbox lock poisoned".to_string()))?
            .push(envelope.clone());
        Ok(())
    }
}
