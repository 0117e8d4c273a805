use std::sync::Arc;

use chrono::NaiveDate;

use stockwatch_core::ProductId;
use stockwatch_products::Product;

use crate::error::RepositoryError;
use crate::evaluator::ExpiryWindow;

/// Storage-side predicate selecting products that may raise an alert.
///
/// It is a superset of what the evaluator flags: records that break the stock
/// invariants always match, so a sweep can still report them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    /// Match products with `0 < reorder_level` and `quantity <= reorder_level`.
    pub low_stock: bool,
    /// Match products whose expiry date is on or before this date.
    pub expires_on_or_before: Option<NaiveDate>,
}

impl ProductFilter {
    /// Candidates for a sweep on `today` with the given checks enabled.
    pub fn alert_candidates(today: NaiveDate, window: ExpiryWindow, low_stock: bool, expiry: bool) -> Self {
        Self {
            low_stock,
            expires_on_or_before: expiry.then(|| window.horizon(today)),
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        if is_malformed(product) {
            return true;
        }

        let low = self.low_stock
            && product.reorder_level > 0
            && product.quantity <= product.reorder_level;

        let expiring = match (self.expires_on_or_before, product.expiry_date) {
            (Some(horizon), Some(expiry_date)) => expiry_date <= horizon,
            _ => false,
        };

        low || expiring
    }
}

fn is_malformed(product: &Product) -> bool {
    product.quantity < 0 || product.reorder_level < 0 || product.name.trim().is_empty()
}

/// A stored record that could not be decoded into a [`Product`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndecodableRecord {
    /// Present when the raw record carried a readable id.
    pub product_id: Option<ProductId>,
    pub reason: String,
}

/// Products read in one pass, plus the records that failed to decode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductScan {
    pub products: Vec<Product>,
    pub undecodable: Vec<UndecodableRecord>,
}

impl ProductScan {
    pub fn retain_matching(mut self, filter: &ProductFilter) -> Self {
        self.products.retain(|p| filter.matches(p));
        self
    }
}

impl From<Vec<Product>> for ProductScan {
    fn from(products: Vec<Product>) -> Self {
        Self {
            products,
            undecodable: Vec::new(),
        }
    }
}

/// Read access to product records.
///
/// Implementations must return a snapshot consistent enough to evaluate; no
/// transactional isolation is required.
pub trait ProductRepository: Send + Sync {
    fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Products matching `filter`.
    ///
    /// The default filters [`list_products`](Self::list_products) in memory;
    /// stores that can evaluate the predicate themselves should override it.
    fn list_products_matching(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        Ok(self
            .list_products()?
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect())
    }

    /// Candidates for a sweep, with any records the store could not decode.
    ///
    /// Stores that decode record by record override this so that one bad row
    /// does not hide the rest.
    fn scan(&self, filter: &ProductFilter) -> Result<ProductScan, RepositoryError> {
        Ok(self.list_products_matching(filter)?.into())
    }
}

impl<R> ProductRepository for Arc<R>
where
    R: ProductRepository + ?Sized,
{
    fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        (**self).list_products()
    }

    fn list_products_matching(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        (**self).list_products_matching(filter)
    }

    fn scan(&self, filter: &ProductFilter) -> Result<ProductScan, RepositoryError> {
        (**self).scan(filter)
    }
}
