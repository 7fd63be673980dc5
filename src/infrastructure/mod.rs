//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Repository implementations
//! - Database connection management

pub mod persistence;
