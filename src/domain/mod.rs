//! Domain layer - Call entities and the persistence port
//!
//! This layer contains:
//! - Entities: Calls and the records captured against them
//! - Repository Interface: The port backends implement
//! - Shared: Errors and the domain Result type

pub mod analytics;
pub mod call;
pub mod metadata;
pub mod recording;
pub mod repository;
pub mod shared;
pub mod transcript;

// Re-export commonly used types
pub use repository::CallRepository;
pub use shared::{Result, StoreError};
