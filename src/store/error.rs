//! Storage engine errors

use thiserror::Error;

/// Errors returned by a storage engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Empty key or value
    #[error("{0}")]
    InvalidArgument(&'static str),

    /// No entry for the key
    #[error("key not found")]
    NotFound,
}

impl StoreError {
    pub(crate) const KEY_REQUIRED: StoreError = StoreError::InvalidArgument("key is required");
    pub(crate) const EMPTY_VALUE: StoreError = StoreError::InvalidArgument("value cannot be empty");
}
