//! Token Management
//!
//! Access token lifecycle for every configured store.
//!
//! This module provides:
//!
//! - **Token Cache**: process-local per-store access token cache
//! - **Token Manager**: validity checks against the credential table and
//!   refresh-token exchange with full-table persistence

pub mod cache;
pub mod manager;

pub use cache::TokenCache;

pub use manager::{
    create_mock_token_manager, create_token_manager, DefaultTokenManager, MockTokenManager,
    TokenManager,
};
