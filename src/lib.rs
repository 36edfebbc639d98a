//! Fulfillment Stock Sync
//!
//! Applies marketplace fulfillment-center stock reports to the Bling ERP
//! inventory of each configured store.
//!
//! # Features
//!
//! - Per-store OAuth token lifecycle with a six-hour validity window
//! - Encrypted credential table with full-table persistence
//! - Inventory API client with bounded 401 recovery and 429 back-off
//! - Bill-of-materials expansion of kit products into base components
//! - Stock balance adjustments posted per base product
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use integrations_fulfillment_sync::{
//!     create_token_manager, sync_config, ApiClient, InMemoryCatalog,
//!     InMemoryCredentialStore, RawReport, ReqwestHttpTransport, StockSynchronizer, StoreKey,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(
//!         sync_config()
//!             .encryption_key(std::env::var("FULL_SYNC_ENCRYPTION_KEY")?)
//!             .store("proteloja", "client-id", "client-secret", 9738790725)
//!             .build()?,
//!     );
//!
//!     let transport = Arc::new(ReqwestHttpTransport::with_timeout(config.timeout)?);
//!     let credentials = Arc::new(InMemoryCredentialStore::new());
//!     let tokens = Arc::new(create_token_manager(config.clone(), transport.clone(), credentials)?);
//!     let client = ApiClient::new(config.clone(), transport, tokens);
//!
//!     let catalog = Arc::new(InMemoryCatalog::new(vec![]));
//!     let sync = StockSynchronizer::new(client, catalog);
//!
//!     let report: RawReport = vec![("A1", 3)].into_iter().collect();
//!     let result = sync.run(&StoreKey::new("proteloja"), &report).await?;
//!     println!("posted {}", result.summary.posted);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `types`: configuration, credential rows and token payloads
//! - `error`: error hierarchy with user-facing messages
//! - `core`: HTTP transport and token encryption
//! - `credentials`: credential table snapshot and storage adapters
//! - `token`: token cache and refresh-token exchange
//! - `client`: authenticated inventory API client
//! - `report`: fulfillment report ingestion
//! - `bom`: product catalog and kit expansion
//! - `sync`: stock adjustment orchestration
//! - `telemetry`: log subscriber setup

pub mod bom;
pub mod builders;
pub mod client;
pub mod core;
pub mod credentials;
#[cfg(feature = "postgres")]
pub mod db;
pub mod error;
pub mod report;
pub mod resilience;
pub mod sync;
pub mod telemetry;
pub mod token;
pub mod types;

// Re-export main client
pub use client::{ApiClient, ApiStats};

// Re-export builders
pub use builders::{sync_config, SyncConfigBuilder};

// Re-export errors
pub use error::{
    create_error_from_response, get_user_message, ApiError, BomError, ConfigurationError,
    CredentialError, DatabaseError, NetworkError, ReportError, SyncError, SyncResult, TokenError,
};

// Re-export types
pub use types::{
    // Config
    StoreConfig, SyncConfig, DEFAULT_BASE_URL,
    // Credentials
    format_timestamp, parse_timestamp, CredentialRecord, StoreKey, TokenKind,
    // Token
    AccessToken, TokenResponse,
};

// Re-export core components
pub use core::{
    // Transport
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockHttpTransport,
    ReqwestHttpTransport,
    // Crypto
    AesGcmCipher, PlaintextCipher, TokenCipher,
};

// Re-export credential storage
pub use credentials::{
    CredentialStore, CredentialTable, InMemoryCredentialStore, MockCredentialStore,
};

#[cfg(feature = "postgres")]
pub use credentials::PostgresCredentialStore;

#[cfg(feature = "postgres")]
pub use db::DatabaseConfig;

// Re-export token management
pub use token::{
    create_mock_token_manager, create_token_manager, DefaultTokenManager, MockTokenManager,
    TokenCache, TokenManager,
};

// Re-export resilience
pub use resilience::{RateLimitPolicy, DEFAULT_RATE_LIMIT_POLICY};

// Re-export report ingestion
pub use report::{RawReport, ReportLayout};

// Re-export BOM expansion
pub use bom::{
    expand, parse_structure, BomFailure, BomStructure, CatalogSource, Component, Expansion,
    ExpansionStatus, InMemoryCatalog, Product, ProductCatalog, StockDelta,
};

#[cfg(feature = "postgres")]
pub use bom::PostgresCatalog;

// Re-export sync
pub use sync::{stock_adjustment_body, DeltaFailure, StockSynchronizer, SyncReport, SyncSummary};

// Re-export telemetry
pub use telemetry::{init_logging, LogFormat, LogLevel, LoggingConfig};
