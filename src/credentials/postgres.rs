//! Postgres Credential Store
//!
//! Credential table backed by Postgres. Expected schema:
//!
//! ```sql
//! CREATE TABLE credenciais (loja TEXT, titulo TEXT, validade TEXT, valor TEXT);
//! ```

use async_trait::async_trait;
use deadpool_postgres::Pool;

use crate::credentials::{CredentialStore, CredentialTable};
use crate::db::{get_client, validate_table_name};
use crate::error::{CredentialError, SyncError};
use crate::types::CredentialRecord;

/// Postgres-backed credential store.
pub struct PostgresCredentialStore {
    pool: Pool,
    table: String,
}

impl PostgresCredentialStore {
    /// Create a store over `table`.
    pub fn new(pool: Pool, table: impl Into<String>) -> Result<Self, SyncError> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { pool, table })
    }

    /// Create the table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<(), SyncError> {
        let client = get_client(&self.pool).await?;
        client
            .batch_execute(&format!(
                "CREATE TABLE IF NOT EXISTS {} (loja TEXT, titulo TEXT, validade TEXT, valor TEXT)",
                self.table
            ))
            .await
            .map_err(|e| CredentialError::WriteFailed {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PostgresCredentialStore {
    async fn load_all(&self) -> Result<CredentialTable, SyncError> {
        let client = get_client(&self.pool).await?;
        let rows = client
            .query(
                &format!(
                    "SELECT loja::text, titulo::text, validade::text, valor::text FROM {}",
                    self.table
                ),
                &[],
            )
            .await
            .map_err(|e| CredentialError::ReadFailed {
                message: e.to_string(),
            })?;

        let records = rows
            .iter()
            .map(|row| CredentialRecord {
                store: row.get::<_, Option<String>>(0).unwrap_or_default(),
                kind: row.get::<_, Option<String>>(1).unwrap_or_default(),
                updated_at: row.get::<_, Option<String>>(2).unwrap_or_default(),
                encrypted_value: row.get::<_, Option<String>>(3).unwrap_or_default(),
            })
            .collect();

        tracing::debug!(table = %self.table, rows = rows.len(), "Loaded credential table");
        Ok(CredentialTable::from_rows(records))
    }

    async fn overwrite(&self, table: &CredentialTable) -> Result<(), SyncError> {
        let write_failed = |e: tokio_postgres::Error| CredentialError::WriteFailed {
            message: e.to_string(),
        };

        let mut client = get_client(&self.pool).await?;
        let tx = client.transaction().await.map_err(write_failed)?;

        tx.execute(&format!("DELETE FROM {}", self.table), &[])
            .await
            .map_err(write_failed)?;

        let insert = tx
            .prepare(&format!(
                "INSERT INTO {} (loja, titulo, validade, valor) VALUES ($1, $2, $3, $4)",
                self.table
            ))
            .await
            .map_err(write_failed)?;

        for row in table.rows() {
            tx.execute(
                &insert,
                &[&row.store, &row.kind, &row.updated_at, &row.encrypted_value],
            )
            .await
            .map_err(write_failed)?;
        }

        tx.commit().await.map_err(write_failed)?;
        tracing::debug!(table = %self.table, rows = table.len(), "Overwrote credential table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DatabaseConfig;

    #[tokio::test]
    async fn test_rejects_unsafe_table_name() {
        let pool = DatabaseConfig::from_lookup(|_| None).create_pool().unwrap();
        assert!(PostgresCredentialStore::new(pool.clone(), "credenciais").is_ok());
        assert!(matches!(
            PostgresCredentialStore::new(pool, "credenciais; --"),
            Err(SyncError::Database(_))
        ));
    }
}
