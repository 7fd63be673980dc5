//! Store result type

use super::error::StoreError;

/// Standard result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
