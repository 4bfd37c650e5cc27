//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur while authenticating a request.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No bearer token on the request.
    #[error("authentication required")]
    MissingToken,

    /// Token is malformed or its signature does not verify.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token has expired.
    #[error("token expired")]
    ExpiredToken,

    /// Token subject no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// Caller lacks the required role.
    #[error("admin access required")]
    Forbidden,

    /// Token could not be signed.
    #[error("token issuance failed: {0}")]
    Issue(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
