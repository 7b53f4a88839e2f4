use thiserror::Error;

/// Failures raised at the store boundary, already classified so callers never
/// inspect driver-specific error shapes.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key violates unique constraint {constraint}")]
    DuplicateKey { constraint: String },
    #[error("record not found")]
    NotFound,
    #[error("store operation timed out")]
    Timeout,
    #[error("stored value could not be decoded: {0}")]
    Decode(String),
    #[error("store failure")]
    Backend(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::Database(ref db_error) if db_error.is_unique_violation() => StoreError::DuplicateKey {
                constraint: db_error.constraint().unwrap_or("unknown").to_string(),
            },
            // 57014 = query_canceled, raised when statement_timeout fires
            sqlx::Error::Database(ref db_error) if db_error.code().as_deref() == Some("57014") => StoreError::Timeout,
            _ => StoreError::Backend(e),
        }
    }
}
