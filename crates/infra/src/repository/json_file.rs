use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use stockwatch_alerts::{
    ProductFilter, ProductRepository, ProductScan, RepositoryError, UndecodableRecord,
};
use stockwatch_core::ProductId;
use stockwatch_products::Product;

/// Product store backed by a JSON array of product records on disk.
///
/// The file is re-read on every call, so each sweep sees the latest export.
/// Records are decoded one by one; a record that does not decode is reported
/// instead of failing the whole read.
#[derive(Debug, Clone)]
pub struct JsonFileProductRepository {
    path: PathBuf,
}

impl JsonFileProductRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<ProductScan, RepositoryError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            RepositoryError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let records: Vec<Value> = serde_json::from_str(&raw)
            .map_err(|e| RepositoryError::Decode(format!("{}: {}", self.path.display(), e)))?;

        let mut scan = ProductScan::default();
        for (index, record) in records.into_iter().enumerate() {
            let product_id = record
                .get("id")
                .and_then(Value::as_str)
                .and_then(|id| id.parse::<ProductId>().ok());

            match serde_json::from_value::<Product>(record) {
                Ok(product) => scan.products.push(product),
                Err(e) => scan.undecodable.push(UndecodableRecord {
                    product_id,
                    reason: format!("record {index}: {e}"),
                }),
            }
        }

        debug!(
            path = %self.path.display(),
            count = scan.products.len(),
            undecodable = scan.undecodable.len(),
            "loaded products from file"
        );
        Ok(scan)
    }
}

impl ProductRepository for JsonFileProductRepository {
    fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let scan = self.read()?;
        if !scan.undecodable.is_empty() {
            warn!(
                path = %self.path.display(),
                skipped = scan.undecodable.len(),
                "some product records could not be decoded"
            );
        }
        Ok(scan.products)
    }

    fn scan(&self, filter: &ProductFilter) -> Result<ProductScan, RepositoryError> {
        Ok(self.read()?.retain_matching(filter))
    }
}
