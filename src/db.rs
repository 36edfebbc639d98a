//! Postgres Connectivity
//!
//! Connection pool setup shared by the credential and catalog adapters.

use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use secrecy::{ExposeSecret, SecretString};
use tokio_postgres::NoTls;

use crate::error::{DatabaseError, SyncError};

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub database: String,
    pub max_connections: usize,
}

impl DatabaseConfig {
    /// Create configuration from environment variables.
    ///
    /// `DATABASE_URL` wins when it parses; otherwise `POSTGRES_HOST`,
    /// `POSTGRES_PORT`, `POSTGRES_USER`, `POSTGRES_PASSWORD` and `POSTGRES_DB`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(database_url) = lookup("DATABASE_URL") {
            if let Ok(url) = url::Url::parse(&database_url) {
                return Self {
                    host: url.host_str().unwrap_or("localhost").to_string(),
                    port: url.port().unwrap_or(5432),
                    user: url.username().to_string(),
                    password: SecretString::new(url.password().unwrap_or("").to_string()),
                    database: url.path().trim_start_matches('/').to_string(),
                    max_connections: 4,
                };
            }
        }

        Self {
            host: lookup("POSTGRES_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: lookup("POSTGRES_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            user: lookup("POSTGRES_USER").unwrap_or_else(|| "postgres".to_string()),
            password: SecretString::new(lookup("POSTGRES_PASSWORD").unwrap_or_default()),
            database: lookup("POSTGRES_DB").unwrap_or_else(|| "postgres".to_string()),
            max_connections: 4,
        }
    }

    /// Create a connection pool. Connections are opened lazily.
    pub fn create_pool(&self) -> Result<Pool, SyncError> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.expose_secret().to_string());
        cfg.dbname = Some(self.database.clone());
        cfg.pool = Some(PoolConfig::new(self.max_connections));

        cfg.create_pool(Some(Runtime::Tokio1), NoTls).map_err(|e| {
            DatabaseError::Pool {
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// Get a client from the pool.
pub(crate) async fn get_client(pool: &Pool) -> Result<deadpool_postgres::Client, DatabaseError> {
    pool.get().await.map_err(|e| DatabaseError::Pool {
        message: e.to_string(),
    })
}

/// Validate a table name before it is spliced into SQL.
///
/// Accepts `name` or `schema.name` made of ASCII letters, digits and
/// underscores, not starting with a digit.
pub fn validate_table_name(name: &str) -> Result<(), DatabaseError> {
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() <= 2 && parts.iter().all(|part| valid_part(part)) {
        Ok(())
    } else {
        Err(DatabaseError::InvalidTableName {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_database_url_wins() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://sync:pw@db.internal:6543/estoque"),
            ("POSTGRES_HOST", "ignored"),
        ]));

        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 6543);
        assert_eq!(config.user, "sync");
        assert_eq!(config.password.expose_secret(), "pw");
        assert_eq!(config.database, "estoque");
    }

    #[test]
    fn test_postgres_variables() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[
            ("POSTGRES_HOST", "pg"),
            ("POSTGRES_PORT", "not a port"),
            ("POSTGRES_DB", "lojas"),
        ]));

        assert_eq!(config.host, "pg");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "lojas");
    }

    #[test]
    fn test_validate_table_name() {
        assert!(validate_table_name("credenciais").is_ok());
        assert!(validate_table_name("public.produtos_2").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("1table").is_err());
        assert!(validate_table_name("t; DROP TABLE x").is_err());
        assert!(validate_table_name("a.b.c").is_err());
    }

    #[tokio::test]
    async fn test_pool_creation_is_lazy() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[]));
        assert!(config.create_pool().is_ok());
    }
}
