//! Shared kernel - error and result types used across the store

pub mod error;
pub mod result;

pub use error::StoreError;
pub use result::Result;
