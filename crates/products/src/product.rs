use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockwatch_core::{CategoryId, DomainError, DomainResult, ProductId, SupplierId};

/// Reference to a catalogue entry owned elsewhere (category or supplier).
///
/// The display name is optional; stores that only keep the foreign key leave it empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRef<Id> {
    pub id: Id,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl<Id> CatalogRef<Id> {
    pub fn new(id: Id) -> Self {
        Self { id, name: None }
    }

    pub fn named(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }
}

/// A product record exactly as the store returned it.
///
/// Numeric fields are signed so that a record breaking the stock invariants can
/// still be loaded and reported instead of failing the whole read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub quantity: i64,
    pub reorder_level: i64,
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub category: Option<CatalogRef<CategoryId>>,
    #[serde(default)]
    pub supplier: Option<CatalogRef<SupplierId>>,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, quantity: i64, reorder_level: i64) -> Self {
        Self {
            id,
            name: name.into(),
            quantity,
            reorder_level,
            expiry_date: None,
            category: None,
            supplier: None,
        }
    }

    pub fn with_expiry_date(mut self, expiry_date: NaiveDate) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    pub fn with_category(mut self, category: CatalogRef<CategoryId>) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_supplier(mut self, supplier: CatalogRef<SupplierId>) -> Self {
        self.supplier = Some(supplier);
        self
    }

    /// Check the record against the stock invariants.
    pub fn validate(&self) -> DomainResult<ValidProduct> {
        if self.name.trim().is_empty() {
            return Err(DomainError::invariant("product name cannot be empty"));
        }

        let quantity = u64::try_from(self.quantity).map_err(|_| {
            DomainError::invariant(format!("quantity must be >= 0 (got {})", self.quantity))
        })?;

        let reorder_level = u64::try_from(self.reorder_level).map_err(|_| {
            DomainError::invariant(format!(
                "reorder_level must be >= 0 (got {})",
                self.reorder_level
            ))
        })?;

        Ok(ValidProduct {
            id: self.id,
            name: self.name.clone(),
            quantity,
            reorder_level,
            expiry_date: self.expiry_date,
            category: self.category.clone(),
            supplier: self.supplier.clone(),
        })
    }
}

/// A product that satisfies the stock invariants.
///
/// Only obtainable through [`Product::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidProduct {
    id: ProductId,
    name: String,
    quantity: u64,
    reorder_level: u64,
    expiry_date: Option<NaiveDate>,
    category: Option<CatalogRef<CategoryId>>,
    supplier: Option<CatalogRef<SupplierId>>,
}

impl ValidProduct {
    pub fn id(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn reorder_level(&self) -> u64 {
        self.reorder_level
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }

    pub fn category(&self) -> Option<&CatalogRef<CategoryId>> {
        self.category.as_ref()
    }

    pub fn supplier(&self) -> Option<&CatalogRef<SupplierId>> {
        self.supplier.as_ref()
    }

    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().and_then(|c| c.name.as_deref())
    }

    pub fn supplier_name(&self) -> Option<&str> {
        self.supplier.as_ref().and_then(|s| s.name.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product_id() -> ProductId {
        ProductId::new()
    }

    #[test]
    fn validate_accepts_well_formed_record() {
        let product = Product::new(test_product_id(), "Test Low Stock Item", 2, 10)
            .with_category(CatalogRef::named(CategoryId::new(), "Dairy"))
            .with_supplier(CatalogRef::new(SupplierId::new()));

        let valid = product.validate().unwrap();
        assert_eq!(valid.id(), product.id);
        assert_eq!(valid.quantity(), 2);
        assert_eq!(valid.reorder_level(), 10);
        assert_eq!(valid.category_name(), Some("Dairy"));
        assert_eq!(valid.supplier_name(), None);
    }

    #[test]
    fn validate_rejects_negative_quantity() {
        let product = Product::new(test_product_id(), "Broken", -1, 5);

        let err = product.validate().unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => assert!(msg.contains("quantity")),
            _ => panic!("Expected InvariantViolation for negative quantity"),
        }
    }

    #[test]
    fn validate_rejects_negative_reorder_level() {
        let product = Product::new(test_product_id(), "Broken", 3, -5);

        let err = product.validate().unwrap_err();
        match err {
            DomainError::InvariantViolation(msg) => assert!(msg.contains("reorder_level")),
            _ => panic!("Expected InvariantViolation for negative reorder level"),
        }
    }

    #[test]
    fn validate_rejects_blank_name() {
        let product = Product::new(test_product_id(), "   ", 3, 5);
        assert!(matches!(
            product.validate(),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn deserializes_record_without_optional_fields() {
        let id = test_product_id();
        let json = format!(
            r#"{{"id":"{id}","name":"Milk","quantity":4,"reorder_level":6}}"#
        );

        let product: Product = serde_json::from_str(&json).unwrap();
        assert_eq!(product.id, id);
        assert_eq!(product.expiry_date, None);
        assert!(product.category.is_none());
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: validation succeeds exactly when both counters are non-negative.
            #[test]
            fn validate_matches_sign_of_counters(
                quantity in -1_000i64..1_000,
                reorder_level in -1_000i64..1_000,
            ) {
                let product = Product::new(test_product_id(), "Item", quantity, reorder_level);
                let result = product.validate();

                prop_assert_eq!(result.is_ok(), quantity >= 0 && reorder_level >= 0);
                if let Ok(valid) = result {
                    prop_assert_eq!(valid.quantity() as i64, quantity);
                    prop_assert_eq!(valid.reorder_level() as i64, reorder_level);
                }
            }
        }
    }
}
