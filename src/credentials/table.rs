//! Credential Table
//!
//! Fully materialized snapshot of the credential table.

use crate::error::CredentialError;
use crate::types::{CredentialRecord, StoreKey, TokenKind};

/// In-memory snapshot of every credential row.
///
/// A refresh reads the whole table, edits the rows it owns and writes the
/// whole table back, so rows for other stores pass through untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CredentialTable {
    rows: Vec<CredentialRecord>,
}

impl CredentialTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from loaded rows.
    pub fn from_rows(rows: Vec<CredentialRecord>) -> Self {
        Self { rows }
    }

    /// First row for a store and kind.
    pub fn find(&self, store: &StoreKey, kind: TokenKind) -> Option<&CredentialRecord> {
        self.rows.iter().find(|row| row.is_for(store, kind))
    }

    /// Row for a store and kind, or `MissingRecord`.
    pub fn require(
        &self,
        store: &StoreKey,
        kind: TokenKind,
    ) -> Result<&CredentialRecord, CredentialError> {
        self.find(store, kind)
            .ok_or_else(|| CredentialError::MissingRecord {
                store: store.to_string(),
                kind: kind.to_string(),
            })
    }

    /// Replace the value and timestamp of every matching row, or append the
    /// record when none matches.
    pub fn upsert(&mut self, record: CredentialRecord) {
        let mut replaced = false;
        for row in self
            .rows
            .iter_mut()
            .filter(|row| row.store == record.store && row.kind == record.kind)
        {
            row.updated_at = record.updated_at.clone();
            row.encrypted_value = record.encrypted_value.clone();
            replaced = true;
        }

        if !replaced {
            self.rows.push(record);
        }
    }

    pub fn rows(&self) -> &[CredentialRecord] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<CredentialRecord> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn stamp() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_find_and_require() {
        let store = StoreKey::new("proteloja");
        let table = CredentialTable::from_rows(vec![CredentialRecord::new(
            &store,
            TokenKind::RefreshToken,
            "enc-refresh".to_string(),
            stamp(),
        )]);

        assert!(table.find(&store, TokenKind::RefreshToken).is_some());
        assert!(table.find(&store, TokenKind::AccessToken).is_none());
        assert!(matches!(
            table.require(&StoreKey::new("other"), TokenKind::RefreshToken),
            Err(CredentialError::MissingRecord { .. })
        ));
    }

    #[test]
    fn test_upsert_preserves_foreign_rows() {
        let mine = StoreKey::new("proteloja");
        let theirs = StoreKey::new("vendolandia");
        let foreign = CredentialRecord {
            store: "MERCADO_LIVRE".to_string(),
            kind: "access_token".to_string(),
            updated_at: "whenever".to_string(),
            encrypted_value: "opaque".to_string(),
        };

        let mut table = CredentialTable::from_rows(vec![
            foreign.clone(),
            CredentialRecord::new(&mine, TokenKind::AccessToken, "old".to_string(), stamp()),
            CredentialRecord::new(&theirs, TokenKind::AccessToken, "keep".to_string(), stamp()),
        ]);

        table.upsert(CredentialRecord::new(
            &mine,
            TokenKind::AccessToken,
            "new".to_string(),
            stamp(),
        ));
        table.upsert(CredentialRecord::new(
            &mine,
            TokenKind::RefreshToken,
            "refresh".to_string(),
            stamp(),
        ));

        assert_eq!(table.len(), 4);
        assert_eq!(table.rows()[0], foreign);
        assert_eq!(
            table.find(&mine, TokenKind::AccessToken).unwrap().encrypted_value,
            "new"
        );
        assert_eq!(
            table.find(&theirs, TokenKind::AccessToken).unwrap().encrypted_value,
            "keep"
        );
        assert_eq!(
            table.find(&mine, TokenKind::RefreshToken).unwrap().encrypted_value,
            "refresh"
        );
    }
}
