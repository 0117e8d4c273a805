//! Wiring from [`AlertConfig`] to a ready-to-run [`AlertSweep`].

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use stockwatch_alerts::{
    AlertSweep, MailTransport, NotificationDispatcher, ProductRepository, RepositoryError,
    StaticRecipients,
};

use crate::config::{AlertConfig, ConfigError, MailBackend, ProductSource};
use crate::mail::{ConsoleTransport, FileOutboxTransport};
use crate::repository::JsonFileProductRepository;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("postgres support not compiled in (enable the `postgres` feature)")]
    PostgresDisabled,

    #[error("cannot open outbox {path}: {source}")]
    Outbox {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub fn open_repository(cfg: &AlertConfig) -> Result<Arc<dyn ProductRepository>, BootstrapError> {
    match cfg.product_source()? {
        ProductSource::JsonFile(path) => {
            info!(path = %path.display(), "reading products from file");
            Ok(Arc::new(JsonFileProductRepository::new(path)))
        }
        #[cfg(feature = "postgres")]
        ProductSource::Postgres(url) => {
            info!("reading products from postgres");
            let repo = crate::repository::PostgresProductRepository::connect_lazy(&url)?;
            Ok(Arc::new(repo))
        }
        #[cfg(not(feature = "postgres"))]
        ProductSource::Postgres(_) => Err(BootstrapError::PostgresDisabled),
    }
}

/// Console output goes to stderr; stdout is reserved for command results.
pub fn console_transport() -> ConsoleTransport {
    ConsoleTransport::stderr()
}

pub fn open_transport(cfg: &AlertConfig) -> Result<Arc<dyn MailTransport>, BootstrapError> {
    match cfg.mail_backend {
        MailBackend::Console => Ok(Arc::new(console_transport())),
        MailBackend::File => {
            let outbox = FileOutboxTransport::open(&cfg.outbox_dir).map_err(|source| {
                BootstrapError::Outbox {
                    path: cfg.outbox_dir.display().to_string(),
                    source,
                }
            })?;
            info!(dir = %outbox.dir().display(), "queueing alerts in outbox");
            Ok(Arc::new(outbox))
        }
    }
}

pub fn build_dispatcher(cfg: &AlertConfig, transport: Arc<dyn MailTransport>) -> NotificationDispatcher {
    NotificationDispatcher::new(transport, Arc::new(StaticRecipients::new(cfg.recipients.clone())))
        .with_config(cfg.dispatcher.clone())
}

/// Repository, transport and dispatcher from configuration.
pub fn build_sweep(cfg: &AlertConfig) -> Result<AlertSweep, BootstrapError> {
    let repository = open_repository(cfg)?;
    let transport = open_transport(cfg)?;
    Ok(AlertSweep::new(repository, build_dispatcher(cfg, transport)))
}
