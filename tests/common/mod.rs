//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use integrations_fulfillment_sync::{
    sync_config, AesGcmCipher, CredentialRecord, RateLimitPolicy, StoreKey, SyncConfig,
    TokenCipher, TokenKind,
};
use secrecy::ExposeSecret;
use wiremock::MockServer;

pub const STORE: &str = "proteloja";
pub const CLIENT_ID: &str = "client-id";
pub const CLIENT_SECRET: &str = "client-secret";
pub const DEPOSIT_ID: u64 = 9738790725;

/// Base64 of `client-id:client-secret`.
pub const BASIC_AUTH: &str = "Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ=";

pub struct Fixture {
    pub server: MockServer,
    pub config: Arc<SyncConfig>,
    pub cipher: AesGcmCipher,
}

pub async fn setup() -> Fixture {
    let server = MockServer::start().await;
    let key = AesGcmCipher::generate_key().unwrap();
    let cipher = AesGcmCipher::from_base64(&key).unwrap();

    let config = sync_config()
        .base_url(server.uri())
        .encryption_key(key.expose_secret().to_string())
        .timeout(Duration::from_secs(5))
        .rate_limit(RateLimitPolicy::fixed(Duration::from_millis(5), 3))
        .store(STORE, CLIENT_ID, CLIENT_SECRET, DEPOSIT_ID)
        .build()
        .unwrap();

    Fixture {
        server,
        config: Arc::new(config),
        cipher,
    }
}

pub fn store() -> StoreKey {
    StoreKey::new(STORE)
}

/// Access and refresh rows for the test store, both stamped `updated_at`.
pub fn seeded_rows(
    cipher: &AesGcmCipher,
    access: &str,
    refresh: &str,
    updated_at: NaiveDateTime,
) -> Vec<CredentialRecord> {
    vec![
        CredentialRecord::new(
            &store(),
            TokenKind::AccessToken,
            cipher.encrypt(access).unwrap(),
            updated_at,
        ),
        CredentialRecord::new(
            &store(),
            TokenKind::RefreshToken,
            cipher.encrypt(refresh).unwrap(),
            updated_at,
        ),
    ]
}

/// Decrypted value of the test store's row of `kind`.
pub fn stored_value(
    cipher: &AesGcmCipher,
    rows: &[CredentialRecord],
    kind: TokenKind,
) -> Option<String> {
    rows.iter()
        .find(|row| row.is_for(&store(), kind))
        .map(|row| cipher.decrypt(&row.encrypted_value).unwrap())
}
