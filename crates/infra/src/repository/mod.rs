//! Product repository adapters.

pub mod in_memory;
pub mod json_file;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use in_memory::InMemoryProductRepository;
pub use json_file::JsonFileProductRepository;
#[cfg(feature = "postgres")]
pub use postgres::PostgresProductRepository;
