mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use stockwatch_alerts::SweepChecks;
use stockwatch_infra::AlertConfig;
use stockwatch_observability::tracing::LogFormat;

use crate::cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.pretty_logs {
        stockwatch_observability::tracing::init(LogFormat::Pretty);
    } else {
        stockwatch_observability::init();
    }

    let mut cfg = AlertConfig::from_env()?;

    match cli.command {
        Command::Sweep {
            source,
            mail,
            today,
            only,
        } => {
            source.apply(&mut cfg);
            mail.apply(&mut cfg);
            let checks = only.map(SweepChecks::from).unwrap_or_default();
            commands::sweep(&cfg, today, checks)
        }
        Command::Watch {
            source,
            mail,
            interval_secs,
            dedupe,
        } => {
            source.apply(&mut cfg);
            mail.apply(&mut cfg);
            if let Some(secs) = interval_secs {
                cfg.interval = std::time::Duration::from_secs(secs);
            }
            commands::watch(&cfg, dedupe)
        }
        Command::CheckProduct {
            source,
            product_id,
            today,
        } => {
            source.apply(&mut cfg);
            commands::check_product(&cfg, product_id, today)
        }
    }
}
