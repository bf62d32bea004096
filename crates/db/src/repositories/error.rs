//! Error type for posting repositories.

use sea_orm::DbErr;
use tally_core::posting::{ErrorKind, PostingError};
use tally_shared::AppError;

/// Errors raised by the posting repositories.
///
/// Posting failures from `tally-core` pass through unchanged; store failures
/// keep the underlying `DbErr`.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A posting rule rejected the operation.
    #[error(transparent)]
    Posting(#[from] PostingError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl RepositoryError {
    /// Returns the taxonomy kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Posting(err) => err.kind(),
            Self::Database(_) => ErrorKind::Store,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Posting(err) => err.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::Posting(err) => err.http_status_code(),
            Self::Database(_) => 500,
        }
    }

    /// Returns true for connection-level failures the caller may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Posting(err) => err.is_retryable(),
            Self::Database(err) => matches!(err, DbErr::ConnectionAcquire(_) | DbErr::Conn(_)),
        }
    }

    /// Returns the posting error, if this is one.
    #[must_use]
    pub const fn as_posting(&self) -> Option<&PostingError> {
        match self {
            Self::Posting(err) => Some(err),
            Self::Database(_) => None,
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Posting(err) => err.into(),
            RepositoryError::Database(err) => Self::Database(err.to_string()),
        }
    }
}
