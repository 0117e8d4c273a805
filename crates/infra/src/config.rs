//! Configuration loading and representation.
//!
//! Everything is read from environment variables; the CLI can override any
//! field after loading.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use stockwatch_alerts::{DispatcherConfig, ExpiryWindow};

pub const ENV_EXPIRY_WINDOW_DAYS: &str = "STOCKWATCH_EXPIRY_WINDOW_DAYS";
pub const ENV_RECIPIENTS: &str = "STOCKWATCH_RECIPIENTS";
pub const ENV_FROM: &str = "STOCKWATCH_FROM";
pub const ENV_SUBJECT_PREFIX: &str = "STOCKWATCH_SUBJECT_PREFIX";
pub const ENV_PRODUCTS_FILE: &str = "STOCKWATCH_PRODUCTS_FILE";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_MAIL_BACKEND: &str = "STOCKWATCH_MAIL_BACKEND";
pub const ENV_OUTBOX_DIR: &str = "STOCKWATCH_OUTBOX_DIR";
pub const ENV_INTERVAL_SECS: &str = "STOCKWATCH_INTERVAL_SECS";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("no product source configured: set STOCKWATCH_PRODUCTS_FILE or DATABASE_URL")]
    NoProductSource,
}

/// Where rendered alerts go.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum MailBackend {
    /// Print to stderr.
    #[default]
    Console,
    /// Write JSON files into the outbox directory.
    File,
}

impl core::str::FromStr for MailBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "file" => Ok(Self::File),
            other => Err(format!("unknown mail backend {other:?} (expected console|file)")),
        }
    }
}

/// Source of product records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductSource {
    JsonFile(PathBuf),
    Postgres(String),
}

/// Fully resolved alerting configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertConfig {
    pub expiry_window: ExpiryWindow,
    pub recipients: Vec<String>,
    pub dispatcher: DispatcherConfig,
    pub products_file: Option<PathBuf>,
    pub database_url: Option<String>,
    pub mail_backend: MailBackend,
    pub outbox_dir: PathBuf,
    pub interval: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            expiry_window: ExpiryWindow::default(),
            recipients: Vec::new(),
            dispatcher: DispatcherConfig::default(),
            products_file: None,
            database_url: None,
            mail_backend: MailBackend::default(),
            outbox_dir: PathBuf::from("outbox"),
            interval: Duration::from_secs(3600),
        }
    }
}

impl AlertConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(raw) = get(ENV_EXPIRY_WINDOW_DAYS) {
            cfg.expiry_window = ExpiryWindow::days(parse(ENV_EXPIRY_WINDOW_DAYS, &raw)?);
        }

        match get(ENV_RECIPIENTS) {
            Some(raw) => cfg.recipients = parse_recipients(&raw),
            None => warn!("{ENV_RECIPIENTS} not set; alerts will be recorded as undelivered"),
        }

        if let Some(from) = get(ENV_FROM) {
            cfg.dispatcher.from = from.trim().to_string();
        }

        // The prefix may legitimately end with whitespace, so it is not trimmed.
        if let Some(prefix) = lookup(ENV_SUBJECT_PREFIX) {
            cfg.dispatcher.subject_prefix = prefix;
        }

        cfg.products_file = get(ENV_PRODUCTS_FILE).map(PathBuf::from);
        cfg.database_url = get(ENV_DATABASE_URL);

        if let Some(raw) = get(ENV_MAIL_BACKEND) {
            cfg.mail_backend = raw.parse().map_err(|reason| ConfigError::Invalid {
                key: ENV_MAIL_BACKEND,
                value: raw.clone(),
                reason,
            })?;
        }

        if let Some(dir) = get(ENV_OUTBOX_DIR) {
            cfg.outbox_dir = PathBuf::from(dir);
        }

        if let Some(raw) = get(ENV_INTERVAL_SECS) {
            let secs: u64 = parse(ENV_INTERVAL_SECS, &raw)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    key: ENV_INTERVAL_SECS,
                    value: raw,
                    reason: "must be greater than zero".to_string(),
                });
            }
            cfg.interval = Duration::from_secs(secs);
        }

        Ok(cfg)
    }

    /// Product file wins over the database when both are set.
    pub fn product_source(&self) -> Result<ProductSource, ConfigError> {
        if let Some(path) = &self.products_file {
            return Ok(ProductSource::JsonFile(path.clone()));
        }
        if let Some(url) = &self.database_url {
            return Ok(ProductSource::Postgres(url.clone()));
        }
        Err(ConfigError::NoProductSource)
    }
}

fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AlertConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AlertConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg, AlertConfig::default());
        assert_eq!(cfg.expiry_window.as_days(), 7);
        assert_eq!(cfg.product_source(), Err(ConfigError::NoProductSource));
    }

    #[test]
    fn reads_all_fields() {
        let cfg = load(&[
            (ENV_EXPIRY_WINDOW_DAYS, "14"),
            (ENV_RECIPIENTS, "staff@example.com, admin@example.com,,"),
            (ENV_FROM, "alerts@example.com"),
            (ENV_SUBJECT_PREFIX, "[Shop] "),
            (ENV_PRODUCTS_FILE, "/var/lib/stock/products.json"),
            (ENV_DATABASE_URL, "postgres://localhost/inventory"),
            (ENV_MAIL_BACKEND, "File"),
            (ENV_OUTBOX_DIR, "/var/spool/stockwatch"),
            (ENV_INTERVAL_SECS, "900"),
        ])
        .unwrap();

        assert_eq!(cfg.expiry_window, ExpiryWindow::days(14));
        assert_eq!(cfg.recipients, vec!["staff@example.com", "admin@example.com"]);
        assert_eq!(cfg.dispatcher.from, "alerts@example.com");
        assert_eq!(cfg.dispatcher.subject_prefix, "[Shop] ");
        assert_eq!(cfg.mail_backend, MailBackend::File);
        assert_eq!(cfg.outbox_dir, PathBuf::from("/var/spool/stockwatch"));
        assert_eq!(cfg.interval, Duration::from_secs(900));
        assert_eq!(
            cfg.product_source().unwrap(),
            ProductSource::JsonFile(PathBuf::from("/var/lib/stock/products.json"))
        );
    }

    #[test]
    fn database_url_is_used_without_product_file() {
        let cfg = load(&[(ENV_DATABASE_URL, "postgres://localhost/inventory")]).unwrap();
        assert_eq!(
            cfg.product_source().unwrap(),
            ProductSource::Postgres("postgres://localhost/inventory".to_string())
        );
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            load(&[(ENV_EXPIRY_WINDOW_DAYS, "-3")]),
            Err(ConfigError::Invalid { key: ENV_EXPIRY_WINDOW_DAYS, .. })
        ));
        assert!(matches!(
            load(&[(ENV_MAIL_BACKEND, "smtp")]),
            Err(ConfigError::Invalid { key: ENV_MAIL_BACKEND, .. })
        ));
        assert!(matches!(
            load(&[(ENV_INTERVAL_SECS, "0")]),
            Err(ConfigError::Invalid { key: ENV_INTERVAL_SECS, .. })
        ));
    }
}
