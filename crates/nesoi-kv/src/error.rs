//! KV driver error types.

use thiserror::Error;

/// Errors surfaced by a KV driver.
///
/// A missing key is not an error: reads return `Ok(None)` instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KvError {
    /// The scan cursor does not belong to any live scan.
    #[error("invalid scan cursor: {0}")]
    InvalidCursor(u64),

    /// A key exceeded the driver's size limit.
    #[error("key too large: {size} bytes (max {max})")]
    KeyTooLarge {
        /// Actual key size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// The backend failed for a reason the driver cannot classify further.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for KV driver operations.
pub type KvResult<T> = Result<T, KvError>;
