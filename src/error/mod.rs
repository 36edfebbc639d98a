//! Error Types
//!
//! Error hierarchy for the fulfillment sync integration.

use std::time::Duration;
use thiserror::Error;

/// Root error type for the fulfillment sync integration.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("BOM error: {0}")]
    Bom(#[from] BomError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl SyncError {
    /// Get error code for telemetry.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "SYNC_CONFIG",
            Self::Credential(_) => "SYNC_CREDENTIAL",
            Self::Token(_) => "SYNC_TOKEN",
            Self::Network(_) => "SYNC_NETWORK",
            Self::Api(_) => "SYNC_API",
            Self::Report(_) => "SYNC_REPORT",
            Self::Bom(_) => "SYNC_BOM",
            Self::Database(_) => "SYNC_DATABASE",
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api(ApiError::RateLimited { .. }) => true,
            Self::Api(ApiError::Status { status, .. }) => *status >= 500,
            Self::Database(DatabaseError::Pool { .. }) => true,
            _ => false,
        }
    }

    /// Get retry-after duration if applicable.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api(ApiError::RateLimited { retry_after, .. }) => *retry_after,
            _ => None,
        }
    }

    /// Check if error requires re-authorizing the store with the provider.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::Unauthorized { .. })
                | Self::Token(TokenError::RefreshRejected { .. })
                | Self::Credential(CredentialError::MissingRecord { .. })
        )
    }
}

/// Configuration error.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid endpoint URL: {url}")]
    InvalidEndpoint { url: String },

    #[error("No configuration for store {store}")]
    UnknownStore { store: String },
}

/// Credential table and encryption error.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Read failed: {message}")]
    ReadFailed { message: String },

    #[error("Write failed: {message}")]
    WriteFailed { message: String },

    #[error("No {kind} credential for {store}")]
    MissingRecord { store: String, kind: String },

    #[error("Invalid credential timestamp: {value}")]
    InvalidTimestamp { value: String },

    #[error("Invalid encryption key: {message}")]
    InvalidKey { message: String },

    #[error("Encryption failed: {message}")]
    EncryptionFailed { message: String },

    #[error("Decryption failed: {message}")]
    DecryptionFailed { message: String },
}

/// Token refresh error.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token refresh rejected by provider: {body}")]
    RefreshRejected { body: String },

    #[error("Token refresh failed with HTTP {status}: {message}")]
    RefreshFailed { status: u16, message: String },

    #[error("Invalid token response: {message}")]
    InvalidResponse { message: String },
}

/// Network/transport error.
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Request timeout after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

/// Remote inventory API error.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized after {attempts} attempts")]
    Unauthorized { attempts: u32 },

    #[error("Rate limited after {attempts} attempts")]
    RateLimited {
        attempts: u32,
        retry_after: Option<Duration>,
    },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },
}

/// Raw stock report error.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Report file {path} not found; check the path and file name")]
    NotFound { path: String },

    #[error("Report file {path} could not be read: {message}")]
    Unreadable { path: String, message: String },

    #[error("Failed to parse report: {0}")]
    Csv(#[from] csv::Error),
}

/// Bill-of-materials structure error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BomError {
    #[error("Malformed BOM structure: {message}")]
    Malformed { message: String },

    #[error("Unterminated string at offset {offset}")]
    UnterminatedString { offset: usize },
}

/// Database connectivity error.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Pool error: {message}")]
    Pool { message: String },

    #[error("Query error: {message}")]
    Query { message: String },

    #[error("Invalid table name: {name}")]
    InvalidTableName { name: String },
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Create error from a non-success inventory API response.
pub fn create_error_from_response(status: u16, body: &str) -> ApiError {
    match status {
        401 => ApiError::Unauthorized { attempts: 1 },
        429 => ApiError::RateLimited {
            attempts: 1,
            retry_after: None,
        },
        _ => ApiError::Status {
            status,
            body: body.to_string(),
        },
    }
}

/// Get operator-facing error message.
pub fn get_user_message(error: &SyncError) -> String {
    match error {
        SyncError::Api(ApiError::Unauthorized { .. })
        | SyncError::Token(TokenError::RefreshRejected { .. }) => {
            "The store's authorization was rejected. Re-authorize the application for this store."
                .to_string()
        }
        SyncError::Api(ApiError::RateLimited { .. }) => {
            "The inventory API kept rate limiting requests. Try again in a few minutes.".to_string()
        }
        SyncError::Report(ReportError::NotFound { path }) => {
            format!("Report {} was not found. Check the path and file name.", path)
        }
        SyncError::Configuration(ConfigurationError::UnknownStore { store }) => {
            format!("Store {} is not configured.", store)
        }
        SyncError::Network(_) => {
            "The inventory API could not be reached. Check the connection and try again."
                .to_string()
        }
        _ => "The stock sync failed. See the log for details.".to_string(),
    }
}
