//! Credentials
//!
//! Credential table snapshot and storage adapters.

pub mod store;
pub mod table;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use store::{CredentialStore, InMemoryCredentialStore, MockCredentialStore};
pub use table::CredentialTable;

#[cfg(feature = "postgres")]
pub use postgres::PostgresCredentialStore;
