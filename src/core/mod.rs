//! Core Components
//!
//! HTTP transport and token encryption shared by the token lifecycle and
//! the API client.

pub mod crypto;
pub mod transport;

pub use crypto::*;
pub use transport::*;
