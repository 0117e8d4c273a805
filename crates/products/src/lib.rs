//! Product records as read from the inventory store.
//!
//! Records are only ever read by this workspace. Validation turns a raw
//! record into a [`ValidProduct`] whose numeric fields cannot be negative.

pub mod product;

pub use product::{CatalogRef, Product, ValidProduct};
