//! Types
//!
//! Data structures shared by the token lifecycle, API client and sync.

pub mod config;
pub mod credential;
pub mod token;

pub use config::{
    StoreConfig, SyncConfig, DEFAULT_ADJUSTMENT_NOTE, DEFAULT_BASE_URL, DEFAULT_TOKEN_TTL,
    STOCK_PATH, TOKEN_PATH,
};
pub use credential::{
    format_timestamp, is_within_validity, local_now, parse_timestamp, CredentialRecord, StoreKey,
    TokenKind, TIMESTAMP_FORMAT,
};
pub use token::{AccessToken, TokenResponse};
