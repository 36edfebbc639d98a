//! Inventory API Client
//!
//! Authenticated JSON requests against the ERP API with bounded recovery
//! from 401 and 429 responses.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::{HttpMethod, HttpRequest, HttpTransport};
use crate::error::{create_error_from_response, ApiError, SyncResult};
use crate::token::TokenManager;
use crate::types::{StoreKey, SyncConfig};

/// Request counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiStats {
    /// HTTP requests sent, retries included.
    pub requests_sent: u64,
    /// Retries caused by 401 responses.
    pub auth_retries: u64,
    /// Back-off sleeps caused by 429 responses.
    pub rate_limit_delays: u64,
    /// Requests that ended in an error.
    pub failures: u64,
}

#[derive(Default)]
struct Counters {
    requests_sent: AtomicU64,
    auth_retries: AtomicU64,
    rate_limit_delays: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ApiStats {
        ApiStats {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            auth_retries: self.auth_retries.load(Ordering::Relaxed),
            rate_limit_delays: self.rate_limit_delays.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// ERP API client.
pub struct ApiClient<T: HttpTransport, M: TokenManager> {
    config: Arc<SyncConfig>,
    transport: Arc<T>,
    tokens: Arc<M>,
    counters: Counters,
}

impl<T: HttpTransport, M: TokenManager> ApiClient<T, M> {
    /// Create a client with custom components.
    pub fn new(config: Arc<SyncConfig>, transport: Arc<T>, tokens: Arc<M>) -> Self {
        Self {
            config,
            transport,
            tokens,
            counters: Counters::default(),
        }
    }

    /// Sync configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Full URL for an API path.
    pub fn url(&self, path: &str) -> String {
        self.config.endpoint_url(path)
    }

    /// Request counters.
    pub fn stats(&self) -> ApiStats {
        self.counters.snapshot()
    }

    /// GET a JSON resource.
    pub async fn get(&self, url: &str, store: &StoreKey) -> SyncResult<serde_json::Value> {
        self.request(HttpMethod::Get, url, None, store).await
    }

    /// POST a JSON body.
    pub async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        store: &StoreKey,
    ) -> SyncResult<serde_json::Value> {
        self.request(HttpMethod::Post, url, Some(body), store).await
    }

    /// Send an authenticated request and decode the JSON response.
    ///
    /// Any 2xx is success; an empty body decodes to `null`. A 401 drops the
    /// store's cached token and resends the same request, at most
    /// `max_auth_retries` times. A 429 sleeps per the rate-limit policy and
    /// resends. Every other status is returned as an error.
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&serde_json::Value>,
        store: &StoreKey,
    ) -> SyncResult<serde_json::Value> {
        let result = self.send_with_recovery(method, url, body, store).await;
        if let Err(e) = &result {
            Counters::bump(&self.counters.failures);
            tracing::warn!(
                store = %store,
                method = %method,
                url = url,
                error = %e,
                code = e.error_code(),
                "API request failed"
            );
        }
        result
    }

    async fn send_with_recovery(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&serde_json::Value>,
        store: &StoreKey,
    ) -> SyncResult<serde_json::Value> {
        let policy = &self.config.rate_limit;
        let mut auth_retries = 0u32;
        let mut rate_limit_retries = 0u32;

        loop {
            let token = self.tokens.get_token(store).await?;

            let mut request = HttpRequest::new(method, url)
                .header("Accept", "application/json")
                .header("Authorization", token.authorization_header());
            if let Some(body) = body {
                request = request.json_body(body);
            }
            request.timeout = Some(self.config.timeout);

            Counters::bump(&self.counters.requests_sent);
            let response = self.transport.send(request).await?;

            match response.status {
                200..=299 => {
                    self.tokens.record_success(store);
                    return decode_body(&response.body);
                }
                401 => {
                    let failures = self.tokens.record_auth_failure(store);
                    self.tokens.invalidate(Some(store));

                    if auth_retries >= self.config.max_auth_retries {
                        return Err(ApiError::Unauthorized {
                            attempts: auth_retries + 1,
                        }
                        .into());
                    }

                    auth_retries += 1;
                    Counters::bump(&self.counters.auth_retries);
                    tracing::warn!(
                        store = %store,
                        attempt = auth_retries,
                        consecutive_failures = failures,
                        "Unauthorized; retrying with a fresh token"
                    );
                }
                429 => {
                    if !policy.allows_retry(rate_limit_retries) {
                        return Err(ApiError::RateLimited {
                            attempts: rate_limit_retries + 1,
                            retry_after: response.retry_after(),
                        }
                        .into());
                    }

                    let delay =
                        policy.delay_with_hint(rate_limit_retries, response.retry_after());
                    rate_limit_retries += 1;
                    Counters::bump(&self.counters.rate_limit_delays);
                    tracing::warn!(
                        store = %store,
                        attempt = rate_limit_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited; backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
                status => {
                    return Err(create_error_from_response(status, &response.body).into());
                }
            }
        }
    }
}

fn decode_body(body: &str) -> SyncResult<serde_json::Value> {
    if body.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(body).map_err(|e| {
        ApiError::InvalidJson {
            message: e.to_string(),
        }
        .into()
    })
}
