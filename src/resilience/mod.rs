//! Resilience
//!
//! Back-off policy for rate-limited inventory API calls. Authentication
//! retries live in the API client because they interact with the token cache.

pub mod retry;

pub use retry::{RateLimitPolicy, DEFAULT_RATE_LIMIT_POLICY};
