use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use stockwatch_alerts::{ProductRepository, RepositoryError};
use stockwatch_products::Product;

/// In-memory product store for tests/dev.
///
/// Can be switched offline to exercise the fatal path of a sweep.
#[derive(Debug, Default)]
pub struct InMemoryProductRepository {
    products: RwLock<Vec<Product>>,
    offline: AtomicBool,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: RwLock::new(products.into_iter().collect()),
            offline: AtomicBool::new(false),
        }
    }

    /// Insert or replace a product by id.
    pub fn upsert(&self, product: Product) {
        if let Ok(mut products) = self.products.write() {
            match products.iter_mut().find(|p| p.id == product.id) {
                Some(existing) => *existing = product,
                None => products.push(product),
            }
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

impl ProductRepository for InMemoryProductRepository {
    fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("in-memory store is offline".to_string()));
        }
        self.products
            .read()
            .map(|p| p.clone())
            .map_err(|_| RepositoryError::Unavailable("product store lock poisoned".to_string()))
    }
}
