//! Builders
//!
//! Fluent builder patterns for sync configuration.

pub mod config;

pub use config::{sync_config, SyncConfigBuilder};
