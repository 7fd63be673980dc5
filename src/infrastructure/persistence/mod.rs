//! Persistence implementations

pub mod memory;
#[cfg(feature = "postgres")]
pub mod database;
#[cfg(feature = "postgres")]
pub mod call_repository;

pub use memory::InMemoryCallRepository;
#[cfg(feature = "postgres")]
pub use database::{close_shared_pool, create_pool, run_migrations, shared_pool, DatabaseConfig};
#[cfg(feature = "postgres")]
pub use call_repository::PgCallRepository;
