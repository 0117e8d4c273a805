use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use stockwatch_alerts::SweepChecks;
use stockwatch_core::ProductId;
use stockwatch_infra::config::{
    ENV_DATABASE_URL, ENV_EXPIRY_WINDOW_DAYS, ENV_INTERVAL_SECS, ENV_MAIL_BACKEND, ENV_OUTBOX_DIR,
    ENV_PRODUCTS_FILE, ENV_RECIPIENTS,
};
use stockwatch_infra::{AlertConfig, MailBackend};

#[derive(Debug, Parser)]
#[command(name = "stockwatch", version, about = "Low-stock and expiry alerts for inventory products")]
pub struct Cli {
    /// Human-readable logs instead of JSON.
    #[arg(long, global = true)]
    pub pretty_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one alert sweep and print its summary as JSON.
    Sweep {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        mail: MailArgs,

        /// Date to evaluate against (defaults to the local date).
        #[arg(long, value_name = "YYYY-MM-DD")]
        today: Option<NaiveDate>,

        /// Restrict the sweep to one family of checks.
        #[arg(long, value_enum)]
        only: Option<CheckFamily>,
    },

    /// Sweep periodically until stdin is closed. Each input line triggers an extra sweep.
    Watch {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        mail: MailArgs,

        /// Seconds between scheduled sweeps.
        #[arg(long, env = ENV_INTERVAL_SECS, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: Option<u64>,

        /// Send each alert at most once per product, kind and day.
        #[arg(long)]
        dedupe: bool,
    },

    /// Show the conditions one product currently triggers, without sending mail.
    CheckProduct {
        #[command(flatten)]
        source: SourceArgs,

        product_id: ProductId,

        #[arg(long, value_name = "YYYY-MM-DD")]
        today: Option<NaiveDate>,
    },
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// JSON file holding an array of product records.
    #[arg(long, env = ENV_PRODUCTS_FILE)]
    pub products_file: Option<PathBuf>,

    /// Postgres connection string (used when no products file is given).
    #[arg(long, env = ENV_DATABASE_URL, hide_env_values = true)]
    pub database_url: Option<String>,

    /// Days ahead within which a product counts as expiring.
    #[arg(long, env = ENV_EXPIRY_WINDOW_DAYS)]
    pub expiry_window_days: Option<u32>,
}

#[derive(Debug, Args)]
pub struct MailArgs {
    /// Comma-separated recipient addresses.
    #[arg(long, env = ENV_RECIPIENTS, value_delimiter = ',')]
    pub recipients: Option<Vec<String>>,

    /// `console` prints messages to stderr; `file` queues them in the outbox directory.
    #[arg(long, env = ENV_MAIL_BACKEND, value_enum)]
    pub mail_backend: Option<Backend>,

    #[arg(long, env = ENV_OUTBOX_DIR)]
    pub outbox_dir: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CheckFamily {
    LowStock,
    Expiry,
}

impl From<CheckFamily> for SweepChecks {
    fn from(f: CheckFamily) -> Self {
        match f {
            CheckFamily::LowStock => SweepChecks::low_stock_only(),
            CheckFamily::Expiry => SweepChecks::expiry_only(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Console,
    File,
}

impl From<Backend> for MailBackend {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Console => MailBackend::Console,
            Backend::File => MailBackend::File,
        }
    }
}

impl SourceArgs {
    pub fn apply(&self, cfg: &mut AlertConfig) {
        if let Some(path) = &self.products_file {
            cfg.products_file = Some(path.clone());
        }
        if let Some(url) = &self.database_url {
            cfg.database_url = Some(url.clone());
        }
        if let Some(days) = self.expiry_window_days {
            cfg.expiry_window = stockwatch_alerts::ExpiryWindow::days(days);
        }
    }
}

impl MailArgs {
    pub fn apply(&self, cfg: &mut AlertConfig) {
        if let Some(recipients) = &self.recipients {
            cfg.recipients = recipients
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect();
        }
        if let Some(backend) = self.mail_backend {
            cfg.mail_backend = backend.into();
        }
        if let Some(dir) = &self.outbox_dir {
            cfg.outbox_dir = dir.clone();
        }
    }
}
