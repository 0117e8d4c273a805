use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde_json::json;
use tracing::info;

use stockwatch_alerts::{AlertCondition, ProductRepository, SweepChecks, evaluate};
use stockwatch_core::{DomainError, ProductId};
use stockwatch_products::Product;
use stockwatch_infra::{AlertConfig, InMemoryAlertLedger, SweepRunner, build_sweep, open_repository};

fn today_or_local(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

/// One sweep; the summary is printed even when some deliveries failed.
pub fn sweep(cfg: &AlertConfig, today: Option<NaiveDate>, checks: SweepChecks) -> Result<()> {
    let today = today_or_local(today);
    let sweep = build_sweep(cfg)?.with_checks(checks);

    let summary = sweep
        .run(today, cfg.expiry_window)
        .context("alert sweep aborted")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Periodic sweeps until stdin reaches EOF.
pub fn watch(cfg: &AlertConfig, dedupe: bool) -> Result<()> {
    let mut sweep = build_sweep(cfg)?;
    if dedupe {
        sweep = sweep.with_ledger(Arc::new(InMemoryAlertLedger::new()));
    }

    let runner = SweepRunner {
        interval: cfg.interval,
        window: cfg.expiry_window,
        ..Default::default()
    };
    let handle = runner
        .spawn("stockwatch-sweeper", sweep)
        .context("failed to start sweep runner")?;

    info!(interval_secs = cfg.interval.as_secs(), dedupe, "watching; close stdin to stop");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        if line.is_err() {
            break;
        }
        handle.trigger();
    }

    let stats = handle.shutdown();

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Evaluate one product and print the conditions it triggers.
pub fn check_product(cfg: &AlertConfig, product_id: ProductId, today: Option<NaiveDate>) -> Result<()> {
    let today = today_or_local(today);
    let repository = open_repository(cfg)?;

    let product = find_product(repository.as_ref(), product_id)?;

    let valid = product
        .validate()
        .with_context(|| format!("product {product_id} is malformed"))?;

    let conditions: Vec<AlertCondition> = evaluate(&valid, today, cfg.expiry_window);

    let report = json!({
        "product": valid,
        "today": today,
        "expiry_window_days": cfg.expiry_window.as_days(),
        "conditions": conditions,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn find_product(repository: &dyn ProductRepository, product_id: ProductId) -> Result<Product> {
    repository
        .list_products()
        .context("cannot load products")?
        .into_iter()
        .find(|p| p.id == product_id)
        .ok_or_else(|| DomainError::not_found(format!("product {product_id}")).into())
}

#[cfg(test)]
mod tests {
    use stockwatch_infra::repository::InMemoryProductRepository;

    use super::*;

    #[test]
    fn find_product_by_id() {
        let id = ProductId::new();
        let repo = InMemoryProductRepository::with_products([
            Product::new(ProductId::new(), "Other", 5, 5),
            Product::new(id, "Milk", 2, 10),
        ]);

        assert_eq!(find_product(&repo, id).unwrap().name, "Milk");
    }

    #[test]
    fn unknown_product_is_not_found() {
        let repo =
            InMemoryProductRepository::with_products([Product::new(ProductId::new(), "Milk", 2, 10)]);

        let err = find_product(&repo, ProductId::new()).unwrap_err();

        assert!(matches!(err.downcast_ref::<DomainError>(), Some(DomainError::NotFound(_))));
    }
}
