use std::io::Write;
use std::sync::Mutex;

use chrono::Utc;

use stockwatch_alerts::{Envelope, MailTransport, TransportError};

const SEPARATOR: &str =
    "-------------------------------------------------------------------------------";

/// Writes each message as plain text to a stream.
///
/// The CLI uses stderr so that stdout carries only the JSON it prints.
pub struct ConsoleTransport {
    stream: &'static str,
    out: Mutex<Box<dyn Write + Send>>,
}

impl core::fmt::Debug for ConsoleTransport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConsoleTransport")
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl ConsoleTransport {
    pub fn stderr() -> Self {
        Self {
            stream: "stderr",
            out: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    pub fn to_writer(out: impl Write + Send + 'static) -> Self {
        Self {
            stream: "writer",
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stream(&self) -> &'static str {
        self.stream
    }
}

impl MailTransport for ConsoleTransport {
    fn send(&self, envelope: &Envelope) -> Result<(), TransportError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| TransportError::Io("console writer lock poisoned".to_string()))?;

        writeln!(out, "Content-Type: text/plain; charset=\"utf-8\"")?;
        writeln!(out, "Subject: {}", envelope.subject)?;
        writeln!(out, "From: {}", envelope.from)?;
        writeln!(out, "To: {}", envelope.to.join(", "))?;
        writeln!(out, "Date: {}", Utc::now().to_rfc2822())?;
        writeln!(out)?;
        writeln!(out, "{}", envelope.body.trim_end())?;
        writeln!(out, "{SEPARATOR}")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_headers_and_body() {
        let buffer = SharedBuffer::default();
        let transport = ConsoleTransport::to_writer(buffer.clone());

        transport
            .send(&Envelope {
                from: "inventory@localhost".to_string(),
                to: vec!["a@example.com".to_string(), "b@example.com".to_string()],
                subject: "[Inventory] Low Stock Alert: Milk".to_string(),
                body: "Current quantity: 2\n".to_string(),
            })
            .unwrap();

        let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("Subject: [Inventory] Low Stock Alert: Milk\n"));
        assert!(text.contains("To: a@example.com, b@example.com\n"));
        assert!(text.contains("\n\nCurrent quantity: 2\n"));
        assert!(text.ends_with(&format!("{SEPARATOR}\n")));
    }

    #[test]
    fn write_error_is_reported() {
        struct Broken;

        impl Write for Broken {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let transport = ConsoleTransport::to_writer(Broken);
        let err = transport
            .send(&Envelope {
                from: "x@localhost".to_string(),
                to: vec!["y@localhost".to_string()],
                subject: "s".to_string(),
                body: "b".to_string(),
            })
            .unwrap_err();

        assert!(matches!(err, TransportError::Io(_)));
    }
}
