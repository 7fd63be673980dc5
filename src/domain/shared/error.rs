//! Store errors

use thiserror::Error;

/// Errors surfaced by the data-access layer.
///
/// Failures from the underlying database client are carried through as
/// [`StoreError::Database`] with the driver error intact as the source;
/// nothing is retried or translated on the way up.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(Box::new(err))
    }
}
