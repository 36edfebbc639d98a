//! Token Manager
//!
//! Per-store access token lifecycle: cache lookup, credential table
//! validation, refresh-token exchange and full-table persistence.

use async_trait::async_trait;
use base64::Engine;
use chrono::NaiveDateTime;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::core::{AesGcmCipher, HttpMethod, HttpRequest, HttpTransport, TokenCipher};
use crate::credentials::{CredentialStore, CredentialTable};
use crate::error::{SyncError, SyncResult, TokenError};
use crate::token::TokenCache;
use crate::types::{
    is_within_validity, local_now, AccessToken, CredentialRecord, StoreKey, SyncConfig,
    TokenKind, TokenResponse,
};

/// Token manager interface.
#[async_trait]
pub trait TokenManager: Send + Sync {
    /// Get a usable access token for a store, refreshing if necessary.
    async fn get_token(&self, store: &StoreKey) -> SyncResult<AccessToken>;

    /// Drop one store's cached token, or all of them.
    fn invalidate(&self, store: Option<&StoreKey>);

    /// Record a 401 for a store. Returns the consecutive failure count.
    fn record_auth_failure(&self, store: &StoreKey) -> u32;

    /// Record an authenticated success for a store.
    fn record_success(&self, store: &StoreKey);
}

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Default token manager implementation.
pub struct DefaultTokenManager<T: HttpTransport, C: CredentialStore, K: TokenCipher> {
    config: Arc<SyncConfig>,
    transport: Arc<T>,
    credentials: Arc<C>,
    cipher: Arc<K>,
    cache: TokenCache,
    auth_failures: Mutex<HashMap<StoreKey, u32>>,
    // Held across read, exchange and overwrite of the credential table.
    refresh_lock: tokio::sync::Mutex<()>,
    clock: Clock,
}

impl<T: HttpTransport, C: CredentialStore, K: TokenCipher> DefaultTokenManager<T, C, K> {
    /// Create new token manager.
    pub fn new(
        config: Arc<SyncConfig>,
        transport: Arc<T>,
        credentials: Arc<C>,
        cipher: Arc<K>,
    ) -> Self {
        Self {
            config,
            transport,
            credentials,
            cipher,
            cache: TokenCache::new(),
            auth_failures: Mutex::new(HashMap::new()),
            refresh_lock: tokio::sync::Mutex::new(()),
            clock: Arc::new(local_now),
        }
    }

    /// Replace the wall clock used for validity checks and timestamps.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Token cache.
    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    fn failure_count(&self, store: &StoreKey) -> u32 {
        self.auth_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(store)
            .copied()
            .unwrap_or(0)
    }

    fn reset_failures(&self, store: &StoreKey) {
        self.auth_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(store);
    }

    fn refresh_forced(&self, store: &StoreKey) -> bool {
        self.failure_count(store) >= self.config.force_refresh_after_failures
    }

    /// Decide between the stored token and a refresh.
    async fn load_or_refresh(&self, store: &StoreKey, forced: bool) -> SyncResult<AccessToken> {
        let table = self.credentials.load_all().await?;
        let now = (self.clock)();

        if forced {
            tracing::info!(store = %store, "Repeated authentication failures; forcing token refresh");
            return self.refresh(store, table).await;
        }

        let Some(access_row) = table.find(store, TokenKind::AccessToken) else {
            tracing::info!(store = %store, "No stored access token; refreshing");
            return self.refresh(store, table).await;
        };

        match access_row.updated_at() {
            Ok(updated_at) if is_within_validity(updated_at, now, self.config.token_ttl) => {
                tracing::debug!(store = %store, "Stored access token still valid");
                Ok(AccessToken::new(
                    self.cipher.decrypt(&access_row.encrypted_value)?,
                ))
            }
            Ok(_) => {
                tracing::info!(store = %store, "Access token older than validity window; refreshing");
                self.refresh(store, table).await
            }
            Err(e) => {
                tracing::warn!(store = %store, error = %e, "Unreadable access token timestamp; refreshing");
                self.refresh(store, table).await
            }
        }
    }

    /// Exchange the stored refresh token and persist the new pair.
    async fn refresh(&self, store: &StoreKey, mut table: CredentialTable) -> SyncResult<AccessToken> {
        let store_config = self.config.store(store)?;
        let refresh_row = table.require(store, TokenKind::RefreshToken)?;
        let refresh_token = self.cipher.decrypt(&refresh_row.encrypted_value)?;

        let credentials = format!(
            "{}:{}",
            store_config.client_id,
            store_config.client_secret.expose_secret()
        );
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);

        let mut request = HttpRequest::new(HttpMethod::Post, self.config.token_endpoint())
            .header("Accept", "1.0")
            .header("Authorization", format!("Basic {}", encoded))
            .json_body(&serde_json::json!({
                "grant_type": "refresh_token",
                "refresh_token": refresh_token,
            }));
        request.timeout = Some(self.config.timeout);

        let response = self.transport.send(request).await?;

        let token_response: TokenResponse = match response.status {
            200..=299 => serde_json::from_str(&response.body).map_err(|e| {
                TokenError::InvalidResponse {
                    message: e.to_string(),
                }
            })?,
            400 => {
                tracing::error!(
                    store = %store,
                    status = response.status,
                    body = %response.body,
                    "Token refresh rejected by provider"
                );
                if self.config.fail_fast_on_rejected_refresh {
                    return Err(TokenError::RefreshRejected {
                        body: response.body,
                    }
                    .into());
                }
                // The provider's body stands in for the token; nothing is persisted.
                return Ok(AccessToken::new(response.body));
            }
            status => {
                return Err(TokenError::RefreshFailed {
                    status,
                    message: response.body,
                }
                .into())
            }
        };

        let now = (self.clock)();
        let new_refresh = token_response.refresh_token.unwrap_or(refresh_token);

        table.upsert(CredentialRecord::new(
            store,
            TokenKind::AccessToken,
            self.cipher.encrypt(&token_response.access_token)?,
            now,
        ));
        table.upsert(CredentialRecord::new(
            store,
            TokenKind::RefreshToken,
            self.cipher.encrypt(&new_refresh)?,
            now,
        ));
        self.credentials.overwrite(&table).await?;
        self.reset_failures(store);

        tracing::info!(store = %store, rows = table.len(), "Refreshed access token");
        Ok(AccessToken::new(token_response.access_token))
    }
}

#[async_trait]
impl<T, C, K> TokenManager for DefaultTokenManager<T, C, K>
where
    T: HttpTransport,
    C: CredentialStore,
    K: TokenCipher,
{
    async fn get_token(&self, store: &StoreKey) -> SyncResult<AccessToken> {
        if !self.refresh_forced(store) {
            if let Some(token) = self.cache.get(store) {
                return Ok(token);
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have finished a refresh while we waited.
        let forced = self.refresh_forced(store);
        if !forced {
            if let Some(token) = self.cache.get(store) {
                return Ok(token);
            }
        }

        let token = self.load_or_refresh(store, forced).await?;
        self.cache.put(store, token.clone());
        Ok(token)
    }

    fn invalidate(&self, store: Option<&StoreKey>) {
        self.cache.invalidate(store);
    }

    fn record_auth_failure(&self, store: &StoreKey) -> u32 {
        let mut failures = self
            .auth_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let count = failures.entry(store.clone()).or_insert(0);
        *count += 1;
        *count
    }

    fn record_success(&self, store: &StoreKey) {
        self.reset_failures(store);
    }
}

/// Create a token manager using the configured AES-256-GCM key.
pub fn create_token_manager<T: HttpTransport, C: CredentialStore>(
    config: Arc<SyncConfig>,
    transport: Arc<T>,
    credentials: Arc<C>,
) -> Result<DefaultTokenManager<T, C, AesGcmCipher>, SyncError> {
    let cipher = AesGcmCipher::from_base64(&config.encryption_key)?;
    Ok(DefaultTokenManager::new(
        config,
        transport,
        credentials,
        Arc::new(cipher),
    ))
}

/// Mock token manager for testing.
#[derive(Default)]
pub struct MockTokenManager {
    tokens: Mutex<HashMap<StoreKey, String>>,
    get_token_history: Mutex<Vec<StoreKey>>,
    invalidations: Mutex<Vec<Option<StoreKey>>>,
    auth_failures: Mutex<HashMap<StoreKey, u32>>,
    next_error: Mutex<Option<SyncError>>,
}

impl MockTokenManager {
    /// Create new mock token manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the token returned for a store.
    pub fn set_token(&self, store: &StoreKey, token: impl Into<String>) -> &Self {
        lock(&self.tokens).insert(store.clone(), token.into());
        self
    }

    /// Fail the next `get_token`.
    pub fn set_next_error(&self, error: SyncError) -> &Self {
        *lock(&self.next_error) = Some(error);
        self
    }

    /// Stores passed to `get_token`, in order.
    pub fn get_token_history(&self) -> Vec<StoreKey> {
        lock(&self.get_token_history).clone()
    }

    /// Arguments passed to `invalidate`, in order.
    pub fn invalidations(&self) -> Vec<Option<StoreKey>> {
        lock(&self.invalidations).clone()
    }

    /// Current consecutive failure count for a store.
    pub fn failure_count(&self, store: &StoreKey) -> u32 {
        lock(&self.auth_failures).get(store).copied().unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl TokenManager for MockTokenManager {
    async fn get_token(&self, store: &StoreKey) -> SyncResult<AccessToken> {
        lock(&self.get_token_history).push(store.clone());

        if let Some(error) = lock(&self.next_error).take() {
            return Err(error);
        }

        let token = lock(&self.tokens)
            .get(store)
            .cloned()
            .unwrap_or_else(|| format!("mock-token-for-{}", store));
        Ok(AccessToken::new(token))
    }

    fn invalidate(&self, store: Option<&StoreKey>) {
        lock(&self.invalidations).push(store.cloned());
    }

    fn record_auth_failure(&self, store: &StoreKey) -> u32 {
        let mut failures = lock(&self.auth_failures);
        let count = failures.entry(store.clone()).or_insert(0);
        *count += 1;
        *count
    }

    fn record_success(&self, store: &StoreKey) {
        lock(&self.auth_failures).remove(store);
    }
}

/// Create mock token manager for testing.
pub fn create_mock_token_manager() -> MockTokenManager {
    MockTokenManager::new()
}
