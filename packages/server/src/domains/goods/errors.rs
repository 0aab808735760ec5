use thiserror::Error;

/// Failures surfaced by goods operations.
///
/// Event delivery and cache failures never appear here: they are logged and
/// swallowed where they happen.
#[derive(Error, Debug)]
pub enum GoodsError {
    /// Client input rejected before touching the store
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or soft-deleted good, or a mutation that matched no rows
    #[error("good not found")]
    NotFound,

    /// Transaction, connection or query failure; the transaction was rolled back
    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

impl GoodsError {
    pub fn validation(message: impl Into<String>) -> Self {
        GoodsError::Validation(message.into())
    }
}

pub type GoodsResult<T> = Result<T, GoodsError>;
