//! Credential Types
//!
//! Store identity and credential table row definitions.

use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::CredentialError;

/// Timestamp format written to the `validade` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Prefix of the `loja` column for every store owner.
pub const STORE_OWNER_PREFIX: &str = "BLING_";

/// Normalized store identifier.
///
/// Store names are compared with all whitespace removed and upper-cased, so
/// `"vendo landia2"` and `"VENDOLANDIA2"` name the same store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StoreKey(String);

impl StoreKey {
    /// Create a normalized store key.
    pub fn new(name: &str) -> Self {
        Self(name.split_whitespace().collect::<String>().to_uppercase())
    }

    /// Normalized key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `loja` column owning this store's credentials.
    pub fn credential_owner(&self) -> String {
        format!("{}{}", STORE_OWNER_PREFIX, self.0)
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoreKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Kind of stored credential.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    AccessToken,
    RefreshToken,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the credential table.
///
/// Columns are kept as raw text so rows this process does not own (other
/// stores, other kinds) survive a full-table overwrite byte for byte.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Owner, `BLING_<STORE>`.
    #[serde(rename = "loja")]
    pub store: String,
    /// `access_token` or `refresh_token`.
    #[serde(rename = "titulo")]
    pub kind: String,
    /// Last-updated timestamp.
    #[serde(rename = "validade")]
    pub updated_at: String,
    /// Encrypted token value.
    #[serde(rename = "valor")]
    pub encrypted_value: String,
}

impl CredentialRecord {
    /// Create a record for a store and kind.
    pub fn new(
        store: &StoreKey,
        kind: TokenKind,
        encrypted_value: String,
        updated_at: NaiveDateTime,
    ) -> Self {
        Self {
            store: store.credential_owner(),
            kind: kind.as_str().to_string(),
            updated_at: format_timestamp(updated_at),
            encrypted_value,
        }
    }

    /// Check whether this row holds the given store's credential of `kind`.
    pub fn is_for(&self, store: &StoreKey, kind: TokenKind) -> bool {
        self.kind == kind.as_str() && self.store == store.credential_owner()
    }

    /// Parsed last-updated timestamp.
    pub fn updated_at(&self) -> Result<NaiveDateTime, CredentialError> {
        parse_timestamp(&self.updated_at)
    }
}

/// Format a timestamp for the `validade` column.
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a `validade` value.
///
/// Accepts the column format with or without fractional seconds, the `T`
/// separated variant, and RFC 3339 (converted to local time).
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, CredentialError> {
    let trimmed = value.trim();
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| {
            DateTime::parse_from_rfc3339(trimmed)
                .map(|dt| dt.with_timezone(&Local).naive_local())
        })
        .map_err(|_| CredentialError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Current local wall-clock time, the clock credential rows are stamped with.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Check whether a token stamped at `updated_at` is still usable at `now`.
///
/// The boundary is inclusive: a token exactly `ttl` old is still valid.
pub fn is_within_validity(updated_at: NaiveDateTime, now: NaiveDateTime, ttl: Duration) -> bool {
    match (now - updated_at).to_std() {
        Ok(age) => age <= ttl,
        // Stamped in the future.
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate, Timelike};

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_store_key_normalization() {
        assert_eq!(StoreKey::new("proteloja").as_str(), "PROTELOJA");
        assert_eq!(StoreKey::new(" Vendo landia2 ").as_str(), "VENDOLANDIA2");
        assert_eq!(StoreKey::new("proteloja").credential_owner(), "BLING_PROTELOJA");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let with_fraction = parse_timestamp("2024-03-01 10:15:30.123456").unwrap();
        assert_eq!(with_fraction.nanosecond(), 123_456_000);

        let without_fraction = parse_timestamp("2024-03-01 10:15:30").unwrap();
        assert_eq!(without_fraction, at(10, 15, 30));

        assert!(parse_timestamp("2024-03-01T10:15:30").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_format_round_trips_through_parse() {
        let stamp = at(8, 0, 0) + ChronoDuration::microseconds(42);
        let text = format_timestamp(stamp);
        assert_eq!(text, "2024-03-01 08:00:00.000042");
        assert_eq!(parse_timestamp(&text).unwrap(), stamp);
    }

    #[test]
    fn test_validity_boundary() {
        let ttl = Duration::from_secs(6 * 3600);
        let updated = at(4, 0, 0);

        assert!(is_within_validity(updated, at(10, 0, 0), ttl));
        assert!(!is_within_validity(updated, at(10, 0, 1), ttl));
        assert!(is_within_validity(updated, at(3, 0, 0), ttl));
    }

    #[test]
    fn test_record_matching() {
        let store = StoreKey::new("proteloja");
        let record = CredentialRecord::new(&store, TokenKind::AccessToken, "x".into(), at(1, 2, 3));

        assert!(record.is_for(&store, TokenKind::AccessToken));
        assert!(!record.is_for(&store, TokenKind::RefreshToken));
        assert!(!record.is_for(&StoreKey::new("vendolandia"), TokenKind::AccessToken));
        assert_eq!(record.updated_at().unwrap(), at(1, 2, 3));
    }
}
