//! Pagination Errors

/// Errors raised while validating page parameters or running the queries
#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    /// `page` was not an integer
    #[error("Invalid page number: {0}")]
    InvalidPage(String),

    /// `limit` was not an integer or was not positive
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl PaginationError {
    /// Check if the caller supplied bad parameters
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            PaginationError::InvalidPage(_) | PaginationError::InvalidLimit(_)
        )
    }
}
