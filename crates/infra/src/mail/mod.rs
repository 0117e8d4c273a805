//! Mail transport adapters.
//!
//! None of these talk SMTP. `console` and `file_outbox` are the hand-off points
//! used in development and by deployments where a separate relay drains the outbox.

pub mod console;
pub mod file_outbox;
pub mod in_memory;

pub use console::ConsoleTransport;
pub use file_outbox::{FileOutboxTransport, OutboxMessage};
pub use in_memory::InMemoryTransport;
