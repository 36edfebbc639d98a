//! Postgres Catalog Source
//!
//! Loads the product catalog from a table with `id`, `sku` and `estrutura`
//! columns.

use async_trait::async_trait;
use deadpool_postgres::Pool;

use crate::bom::{CatalogSource, Product, ProductCatalog};
use crate::db::{get_client, validate_table_name};
use crate::error::{DatabaseError, SyncError, SyncResult};

/// Postgres-backed catalog source.
pub struct PostgresCatalog {
    pool: Pool,
    table: String,
}

impl PostgresCatalog {
    /// Create a source over `table`.
    pub fn new(pool: Pool, table: impl Into<String>) -> Result<Self, SyncError> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { pool, table })
    }
}

#[async_trait]
impl CatalogSource for PostgresCatalog {
    async fn load(&self) -> SyncResult<ProductCatalog> {
        let client = get_client(&self.pool).await?;
        let rows = client
            .query(
                &format!(
                    "SELECT id::text, sku::text, estrutura::text FROM {}",
                    self.table
                ),
                &[],
            )
            .await
            .map_err(|e| DatabaseError::Query {
                message: e.to_string(),
            })?;

        let mut skipped = 0usize;
        let products: Vec<Product> = rows
            .iter()
            .filter_map(|row| {
                let id = row.get::<_, Option<String>>(0);
                let sku = row.get::<_, Option<String>>(1);
                match (id, sku) {
                    (Some(id), Some(sku)) if !id.is_empty() && !sku.is_empty() => Some(Product {
                        id,
                        sku,
                        structure: row.get::<_, Option<String>>(2).unwrap_or_default(),
                    }),
                    _ => {
                        skipped += 1;
                        None
                    }
                }
            })
            .collect();

        if skipped > 0 {
            tracing::warn!(table = %self.table, skipped, "Skipped catalog rows without id or SKU");
        }
        tracing::debug!(table = %self.table, products = products.len(), "Loaded product catalog");

        Ok(ProductCatalog::new(products))
    }
}
