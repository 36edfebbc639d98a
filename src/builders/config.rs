//! Configuration Builder
//!
//! Fluent builder for sync configuration.

use secrecy::SecretString;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::{ConfigurationError, SyncError};
use crate::report::ReportLayout;
use crate::resilience::RateLimitPolicy;
use crate::types::config::{
    DEFAULT_CREDENTIALS_TABLE, DEFAULT_PRODUCTS_TABLE, DEFAULT_TIMEOUT,
};
use crate::types::{
    StoreConfig, StoreKey, SyncConfig, DEFAULT_ADJUSTMENT_NOTE, DEFAULT_BASE_URL,
    DEFAULT_TOKEN_TTL,
};

/// Sync configuration builder.
pub struct SyncConfigBuilder {
    base_url: String,
    timeout: Duration,
    encryption_key: Option<SecretString>,
    token_ttl: Duration,
    max_auth_retries: u32,
    force_refresh_after_failures: u32,
    fail_fast_on_rejected_refresh: bool,
    rate_limit: RateLimitPolicy,
    report_layout: ReportLayout,
    adjustment_note: String,
    credentials_table: String,
    products_table: String,
    stores: HashMap<StoreKey, StoreConfig>,
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncConfigBuilder {
    /// Create new configuration builder.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            encryption_key: None,
            token_ttl: DEFAULT_TOKEN_TTL,
            max_auth_retries: 2,
            force_refresh_after_failures: 2,
            fail_fast_on_rejected_refresh: false,
            rate_limit: RateLimitPolicy::default(),
            report_layout: ReportLayout::default(),
            adjustment_note: DEFAULT_ADJUSTMENT_NOTE.to_string(),
            credentials_table: DEFAULT_CREDENTIALS_TABLE.to_string(),
            products_table: DEFAULT_PRODUCTS_TABLE.to_string(),
            stores: HashMap::new(),
        }
    }

    /// Set ERP base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set base64 token encryption key.
    pub fn encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(SecretString::new(key.into()));
        self
    }

    /// Set access token reuse window.
    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Set the 401 retry cap per request.
    pub fn max_auth_retries(mut self, retries: u32) -> Self {
        self.max_auth_retries = retries;
        self
    }

    /// Set how many consecutive 401s force a refresh.
    pub fn force_refresh_after_failures(mut self, failures: u32) -> Self {
        self.force_refresh_after_failures = failures;
        self
    }

    /// Fail on a rejected refresh instead of using the provider's body.
    pub fn fail_fast_on_rejected_refresh(mut self, enable: bool) -> Self {
        self.fail_fast_on_rejected_refresh = enable;
        self
    }

    /// Set 429 retry policy.
    pub fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = policy;
        self
    }

    /// Set raw report layout.
    pub fn report_layout(mut self, layout: ReportLayout) -> Self {
        self.report_layout = layout;
        self
    }

    /// Set stock adjustment note.
    pub fn adjustment_note(mut self, note: impl Into<String>) -> Self {
        self.adjustment_note = note.into();
        self
    }

    /// Set credential table name.
    pub fn credentials_table(mut self, table: impl Into<String>) -> Self {
        self.credentials_table = table.into();
        self
    }

    /// Set product catalog table name.
    pub fn products_table(mut self, table: impl Into<String>) -> Self {
        self.products_table = table.into();
        self
    }

    /// Add a store.
    pub fn store(
        mut self,
        store: impl AsRef<str>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        deposit_id: u64,
    ) -> Self {
        self.stores.insert(
            StoreKey::new(store.as_ref()),
            StoreConfig {
                client_id: client_id.into(),
                client_secret: SecretString::new(client_secret.into()),
                deposit_id,
            },
        );
        self
    }

    /// Build the sync configuration.
    pub fn build(self) -> Result<SyncConfig, SyncError> {
        let encryption_key = self.encryption_key.ok_or_else(|| {
            SyncError::Configuration(ConfigurationError::MissingRequired {
                field: "encryption_key".to_string(),
            })
        })?;

        let parsed = url::Url::parse(&self.base_url).map_err(|_| {
            SyncError::Configuration(ConfigurationError::InvalidEndpoint {
                url: self.base_url.clone(),
            })
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SyncError::Configuration(ConfigurationError::InvalidEndpoint {
                url: self.base_url,
            }));
        }

        if self.timeout.is_zero() {
            return Err(SyncError::Configuration(ConfigurationError::InvalidConfig {
                message: "timeout must be greater than zero".to_string(),
            }));
        }

        Ok(SyncConfig {
            base_url: self.base_url,
            timeout: self.timeout,
            encryption_key,
            token_ttl: self.token_ttl,
            max_auth_retries: self.max_auth_retries,
            force_refresh_after_failures: self.force_refresh_after_failures,
            fail_fast_on_rejected_refresh: self.fail_fast_on_rejected_refresh,
            rate_limit: self.rate_limit,
            report_layout: self.report_layout,
            adjustment_note: self.adjustment_note,
            credentials_table: self.credentials_table,
            products_table: self.products_table,
            stores: self.stores,
        })
    }
}

/// Create a new sync configuration builder.
pub fn sync_config() -> SyncConfigBuilder {
    SyncConfigBuilder::new()
}
