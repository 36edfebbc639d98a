//! Configuration Types
//!
//! Sync configuration, per-store credentials and deposit ids.

use secrecy::SecretString;
use std::collections::HashMap;
use std::time::Duration;

use crate::builders::SyncConfigBuilder;
use crate::error::{ConfigurationError, SyncError, SyncResult};
use crate::report::ReportLayout;
use crate::resilience::RateLimitPolicy;
use crate::types::StoreKey;

/// Default ERP base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.bling.com.br";

/// OAuth token endpoint path.
pub const TOKEN_PATH: &str = "/Api/v3/oauth/token";

/// Stock adjustment endpoint path.
pub const STOCK_PATH: &str = "/Api/v3/estoques";

/// Access tokens are reused for this long after their last update.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Default HTTP timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default note attached to every stock adjustment.
pub const DEFAULT_ADJUSTMENT_NOTE: &str = "AUTOMÁTICO - ESTOQUE FULL ML ATUALIZADO";

pub const DEFAULT_CREDENTIALS_TABLE: &str = "credenciais";
pub const DEFAULT_PRODUCTS_TABLE: &str = "produtos";

/// Sync configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// ERP base URL.
    pub base_url: String,
    /// HTTP timeout.
    pub timeout: Duration,
    /// Base64 AES-256 key protecting stored tokens.
    pub encryption_key: SecretString,
    /// Access token reuse window.
    pub token_ttl: Duration,
    /// Consecutive 401 retries allowed per request.
    pub max_auth_retries: u32,
    /// Consecutive 401s for a store after which the next lookup refreshes.
    pub force_refresh_after_failures: u32,
    /// Fail instead of using the provider's body when a refresh is rejected.
    pub fail_fast_on_rejected_refresh: bool,
    /// Retry policy for 429 responses.
    pub rate_limit: RateLimitPolicy,
    /// Raw report layout.
    pub report_layout: ReportLayout,
    /// Note attached to every stock adjustment.
    pub adjustment_note: String,
    /// Credential table name.
    pub credentials_table: String,
    /// Product catalog table name.
    pub products_table: String,
    /// Per-store settings.
    pub stores: HashMap<StoreKey, StoreConfig>,
}

impl SyncConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::new()
    }

    /// Creates a configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FULL_SYNC_ENCRYPTION_KEY` (required): base64 token encryption key
    /// - `FULL_SYNC_BASE_URL` (optional): ERP base URL
    /// - `FULL_SYNC_TIMEOUT` (optional): request timeout in seconds
    /// - `FULL_SYNC_CREDENTIALS_TABLE`, `FULL_SYNC_PRODUCTS_TABLE` (optional)
    /// - `FULL_SYNC_STORES` (optional): comma separated store names; for each
    ///   `BLING_CLIENT_ID_<STORE>`, `BLING_CLIENT_SECRET_<STORE>` and
    ///   `BLING_DEPOSIT_ID_<STORE>` are required
    pub fn from_env() -> SyncResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates a configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> SyncResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name).ok_or_else(|| ConfigurationError::MissingRequired {
                field: name.to_string(),
            })
        };

        let mut builder = SyncConfigBuilder::new().encryption_key(require("FULL_SYNC_ENCRYPTION_KEY")?);

        if let Some(base_url) = lookup("FULL_SYNC_BASE_URL") {
            builder = builder.base_url(base_url);
        }

        if let Some(timeout) = lookup("FULL_SYNC_TIMEOUT") {
            let secs = timeout.trim().parse::<u64>().map_err(|_| {
                ConfigurationError::InvalidConfig {
                    message: format!("FULL_SYNC_TIMEOUT must be whole seconds, got {}", timeout),
                }
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if let Some(table) = lookup("FULL_SYNC_CREDENTIALS_TABLE") {
            builder = builder.credentials_table(table);
        }

        if let Some(table) = lookup("FULL_SYNC_PRODUCTS_TABLE") {
            builder = builder.products_table(table);
        }

        let stores = lookup("FULL_SYNC_STORES").unwrap_or_default();
        for name in stores.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let key = StoreKey::new(name);
            let client_id = require(&format!("BLING_CLIENT_ID_{}", key))?;
            let client_secret = require(&format!("BLING_CLIENT_SECRET_{}", key))?;
            let deposit_var = format!("BLING_DEPOSIT_ID_{}", key);
            let deposit_id = require(&deposit_var)?.trim().parse::<u64>().map_err(|_| {
                ConfigurationError::InvalidConfig {
                    message: format!("{} must be a numeric deposit id", deposit_var),
                }
            })?;
            builder = builder.store(name, client_id, client_secret, deposit_id);
        }

        builder.build()
    }

    /// Returns the full URL for an endpoint path.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// OAuth token endpoint URL.
    pub fn token_endpoint(&self) -> String {
        self.endpoint_url(TOKEN_PATH)
    }

    /// Stock adjustment endpoint URL.
    pub fn stock_endpoint(&self) -> String {
        self.endpoint_url(STOCK_PATH)
    }

    /// Settings for one store.
    pub fn store(&self, store: &StoreKey) -> Result<&StoreConfig, SyncError> {
        self.stores.get(store).ok_or_else(|| {
            ConfigurationError::UnknownStore {
                store: store.to_string(),
            }
            .into()
        })
    }
}

/// Per-store OAuth client credentials and stock location.
#[derive(Clone)]
pub struct StoreConfig {
    /// OAuth client identifier.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: SecretString,
    /// Deposit (warehouse) id that receives the adjustments.
    pub deposit_id: u64,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("deposit_id", &self.deposit_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_from_lookup_with_stores() {
        let config = SyncConfig::from_lookup(lookup_from(&[
            ("FULL_SYNC_ENCRYPTION_KEY", "a2V5"),
            ("FULL_SYNC_STORES", "proteloja, vendolandia2"),
            ("BLING_CLIENT_ID_PROTELOJA", "id-1"),
            ("BLING_CLIENT_SECRET_PROTELOJA", "secret-1"),
            ("BLING_DEPOSIT_ID_PROTELOJA", "9738790725"),
            ("BLING_CLIENT_ID_VENDOLANDIA2", "id-2"),
            ("BLING_CLIENT_SECRET_VENDOLANDIA2", "secret-2"),
            ("BLING_DEPOSIT_ID_VENDOLANDIA2", "14886665514"),
            ("FULL_SYNC_TIMEOUT", "10"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.stores.len(), 2);

        let store = config.store(&StoreKey::new("Proteloja")).unwrap();
        assert_eq!(store.client_id, "id-1");
        assert_eq!(store.client_secret.expose_secret(), "secret-1");
        assert_eq!(store.deposit_id, 9738790725);
    }

    #[test]
    fn test_from_lookup_requires_key() {
        let result = SyncConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(
            result,
            Err(SyncError::Configuration(ConfigurationError::MissingRequired { .. }))
        ));
    }

    #[test]
    fn test_from_lookup_requires_store_credentials() {
        let result = SyncConfig::from_lookup(lookup_from(&[
            ("FULL_SYNC_ENCRYPTION_KEY", "a2V5"),
            ("FULL_SYNC_STORES", "proteloja"),
            ("BLING_CLIENT_ID_PROTELOJA", "id-1"),
        ]));
        match result {
            Err(SyncError::Configuration(ConfigurationError::MissingRequired { field })) => {
                assert_eq!(field, "BLING_CLIENT_SECRET_PROTELOJA")
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_endpoints() {
        let config = SyncConfig::builder()
            .encryption_key("a2V5")
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();

        assert_eq!(config.token_endpoint(), "http://localhost:8080/Api/v3/oauth/token");
        assert_eq!(config.stock_endpoint(), "http://localhost:8080/Api/v3/estoques");
        assert!(config.store(&StoreKey::new("missing")).is_err());
    }
}
