//! Utility functions shared across the devrelay crates.

pub mod retry;
pub mod text_processing;

pub use retry::{DEFAULT_MAX_ATTEMPTS, DEVICE_STATUS_MAX_ATTEMPTS, RETRY_BASE_DELAY, Retryable, RetryPolicy, with_retry};
pub use text_processing::tokenize;
