//! Credential Storage
//!
//! Credential table access behind a trait, with in-memory and mock
//! implementations.

use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};

use crate::credentials::CredentialTable;
use crate::error::{CredentialError, SyncError};
use crate::types::CredentialRecord;

/// Credential table interface.
///
/// The table is only ever read in full and written in full.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read every row.
    async fn load_all(&self) -> Result<CredentialTable, SyncError>;

    /// Replace the whole table with `table`.
    async fn overwrite(&self, table: &CredentialTable) -> Result<(), SyncError>;
}

/// In-memory credential store.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    rows: Mutex<Vec<CredentialRecord>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with rows.
    pub fn with_rows(rows: Vec<CredentialRecord>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Current rows.
    pub fn snapshot(&self) -> Vec<CredentialRecord> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load_all(&self) -> Result<CredentialTable, SyncError> {
        Ok(CredentialTable::from_rows(self.snapshot()))
    }

    async fn overwrite(&self, table: &CredentialTable) -> Result<(), SyncError> {
        *self.rows.lock().unwrap_or_else(PoisonError::into_inner) = table.rows().to_vec();
        Ok(())
    }
}

/// Mock credential store for testing.
///
/// Records every call and can fail the next read or write.
#[derive(Default)]
pub struct MockCredentialStore {
    inner: InMemoryCredentialStore,
    load_count: Mutex<u32>,
    overwrite_history: Mutex<Vec<Vec<CredentialRecord>>>,
    fail_next_load: Mutex<Option<String>>,
    fail_next_overwrite: Mutex<Option<String>>,
}

impl MockCredentialStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store seeded with rows.
    pub fn with_rows(rows: Vec<CredentialRecord>) -> Self {
        Self {
            inner: InMemoryCredentialStore::with_rows(rows),
            ..Self::default()
        }
    }

    /// Fail the next `load_all`.
    pub fn fail_next_load(&self, message: impl Into<String>) -> &Self {
        *lock(&self.fail_next_load) = Some(message.into());
        self
    }

    /// Fail the next `overwrite`.
    pub fn fail_next_overwrite(&self, message: impl Into<String>) -> &Self {
        *lock(&self.fail_next_overwrite) = Some(message.into());
        self
    }

    /// Number of `load_all` calls.
    pub fn load_count(&self) -> u32 {
        *lock(&self.load_count)
    }

    /// Every table written, in order.
    pub fn overwrite_history(&self) -> Vec<Vec<CredentialRecord>> {
        lock(&self.overwrite_history).clone()
    }

    /// Current rows.
    pub fn snapshot(&self) -> Vec<CredentialRecord> {
        self.inner.snapshot()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn load_all(&self) -> Result<CredentialTable, SyncError> {
        *lock(&self.load_count) += 1;
        if let Some(message) = lock(&self.fail_next_load).take() {
            return Err(CredentialError::ReadFailed { message }.into());
        }
        self.inner.load_all().await
    }

    async fn overwrite(&self, table: &CredentialTable) -> Result<(), SyncError> {
        if let Some(message) = lock(&self.fail_next_overwrite).take() {
            return Err(CredentialError::WriteFailed { message }.into());
        }
        lock(&self.overwrite_history).push(table.rows().to_vec());
        self.inner.overwrite(table).await
    }
}
