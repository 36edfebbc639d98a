//! Bill of Materials
//!
//! Product catalog, tolerant structure parsing and expansion of report
//! quantities into per-product stock deltas.

pub mod aggregator;
pub mod catalog;
pub mod parser;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use aggregator::{expand, BomFailure, Expansion, ExpansionStatus, StockDelta};
pub use catalog::{CatalogSource, InMemoryCatalog, Product, ProductCatalog};
pub use parser::{parse_structure, BomStructure, Component, ComponentProduct};

#[cfg(feature = "postgres")]
pub use postgres::PostgresCatalog;
