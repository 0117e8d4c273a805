use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockwatch_alerts::{Envelope, MailTransport, TransportError};

/// One queued message as written to the outbox directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub id: Uuid,
    pub queued_at: DateTime<Utc>,
    pub envelope: Envelope,
}

/// Writes each message as a JSON file into a directory for a relay to pick up.
///
/// Files are written under a temporary name and renamed, so a reader never
/// sees a partial message.
#[derive(Debug, Clone)]
pub struct FileOutboxTransport {
    dir: PathBuf,
}

impl FileOutboxTransport {
    /// Use `dir` as the outbox, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Messages currently in the outbox, oldest first.
    pub fn pending(&self) -> std::io::Result<Vec<OutboxMessage>> {
        let mut messages = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = fs::read_to_string(&path)?;
            let message: OutboxMessage = serde_json::from_str(&raw)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            messages.push(message);
        }
        messages.sort_by_key(|m| (m.queued_at, m.id));
        Ok(messages)
    }
}

impl MailTransport for FileOutboxTransport {
    fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let message = OutboxMessage {
            id: Uuid::now_v7(),
            queued_at: Utc::now(),
            envelope: envelope.clone(),
        };

        let json = serde_json::to_vec_pretty(&message)
            .map_err(|e| TransportError::Rejected(e.to_string()))?;

        let tmp = self.dir.join(format!(".{}.tmp", message.id));
        let path = self.dir.join(format!("{}.json", message.id));
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
