//! Infrastructure layer: product stores, mail transports, config, scheduling.

pub mod bootstrap;
pub mod config;
pub mod ledger;
pub mod mail;
pub mod repository;
pub mod runner;


pub use bootstrap::{BootstrapError, build_dispatcher, build_sweep, open_repository, open_transport};
pub use config::{AlertConfig, ConfigError, MailBackend, ProductSource};
pub use ledger::InMemoryAlertLedger;
pub use runner::{Clock, RunnerStats, SweepRunner, SweepRunnerHandle, local_clock};
