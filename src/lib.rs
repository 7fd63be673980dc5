//! Callstore - persistence layer for a call-center voice platform
//!
//! Stores calls, recordings, transcripts, analytics snapshots, and per-call
//! metadata behind a single async repository trait. The PostgreSQL
//! implementation rides on sqlx; an in-memory implementation backs tests and
//! deployments without a database.

pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use domain::repository::CallRepository;
pub use domain::shared::error::StoreError;
pub use domain::shared::result::Result;
