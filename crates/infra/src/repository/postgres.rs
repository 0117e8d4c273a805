//! Postgres-backed product repository.
//!
//! Reads the `products` table (see `migrations/`). The sweep interface is
//! synchronous, so the repository owns a small current-thread runtime and
//! blocks on each query. Do not call it from inside another Tokio runtime.

use chrono::NaiveDate;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use tracing::debug;
use uuid::Uuid;

use stockwatch_alerts::{ProductFilter, ProductRepository, RepositoryError};
use stockwatch_core::{CategoryId, ProductId, SupplierId};
use stockwatch_products::{CatalogRef, Product};

const SELECT_PRODUCTS: &str = r#"
    SELECT
        id,
        name,
        quantity,
        reorder_level,
        expiry_date,
        category_id,
        category_name,
        supplier_id,
        supplier_name
    FROM products
"#;

/// Mirrors `ProductFilter::matches`, including the malformed-record clause.
const CANDIDATE_PREDICATE: &str = r#"
    WHERE quantity < 0
       OR reorder_level < 0
       OR btrim(name) = ''
       OR ($1 AND reorder_level > 0 AND quantity <= reorder_level)
       OR ($2::date IS NOT NULL AND expiry_date IS NOT NULL AND expiry_date <= $2::date)
"#;

pub struct PostgresProductRepository {
    pool: PgPool,
    runtime: tokio::runtime::Runtime,
}

impl core::fmt::Debug for PostgresProductRepository {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostgresProductRepository").finish_non_exhaustive()
    }
}

impl PostgresProductRepository {
    /// Prepare a lazily connecting pool; no connection is opened until the first query.
    pub fn connect_lazy(database_url: &str) -> Result<Self, RepositoryError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RepositoryError::Unavailable(format!("failed to start runtime: {e}")))?;

        let pool = {
            let _guard = runtime.enter();
            PgPoolOptions::new()
                .max_connections(2)
                .connect_lazy(database_url)
                .map_err(|e| RepositoryError::Unavailable(e.to_string()))?
        };

        Ok(Self { pool, runtime })
    }

    fn fetch(&self, filter: Option<&ProductFilter>) -> Result<Vec<Product>, RepositoryError> {
        let rows = self.runtime.block_on(async {
            match filter {
                None => {
                    let sql = format!("{SELECT_PRODUCTS} ORDER BY name");
                    sqlx::query(&sql).fetch_all(&self.pool).await
                }
                Some(f) => {
                    let sql = format!("{SELECT_PRODUCTS} {CANDIDATE_PREDICATE} ORDER BY name");
                    sqlx::query(&sql)
                        .bind(f.low_stock)
                        .bind(f.expires_on_or_before)
                        .fetch_all(&self.pool)
                        .await
                }
            }
        });

        let rows = rows.map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        debug!(count = rows.len(), filtered = filter.is_some(), "loaded products from postgres");

        rows.iter().map(row_to_product).collect()
    }
}

impl ProductRepository for PostgresProductRepository {
    fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        self.fetch(None)
    }

    fn list_products_matching(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        self.fetch(Some(filter))
    }
}

fn row_to_product(row: &PgRow) -> Result<Product, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let id: Uuid = row.try_get("id").map_err(decode)?;
    let name: String = row.try_get("name").map_err(decode)?;
    let quantity: i64 = row.try_get("quantity").map_err(decode)?;
    let reorder_level: i64 = row.try_get("reorder_level").map_err(decode)?;
    let expiry_date: Option<NaiveDate> = row.try_get("expiry_date").map_err(decode)?;
    let category_id: Option<Uuid> = row.try_get("category_id").map_err(decode)?;
    let category_name: Option<String> = row.try_get("category_name").map_err(decode)?;
    let supplier_id: Option<Uuid> = row.try_get("supplier_id").map_err(decode)?;
    let supplier_name: Option<String> = row.try_get("supplier_name").map_err(decode)?;

    Ok(Product {
        id: ProductId::from_uuid(id),
        name,
        quantity,
        reorder_level,
        expiry_date,
        category: category_id.map(|id| CatalogRef {
            id: CategoryId::from_uuid(id),
            name: category_name,
        }),
        supplier: supplier_id.map(|id| CatalogRef {
            id: SupplierId::from_uuid(id),
            name: supplier_name,
        }),
    })
}
