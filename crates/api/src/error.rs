//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`. Every error renders the JSON envelope
//! `{ "success": false, "message": "..." }`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::razorpay::RazorpayError;
use crate::services::auth::AuthError;
use crate::services::orders::OrderError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Order operation failed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Authentication failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("{0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Rate limited; seconds until the window resets.
    #[error("Too many requests. Try again after {0} seconds.")]
    RateLimited(u64),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<RazorpayError> for AppError {
    fn from(err: RazorpayError) -> Self {
        Self::Order(OrderError::Gateway(err))
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Order(err) => match err {
                OrderError::Invalid(_) | OrderError::MissingField(_) | OrderError::Amount(_) => {
                    StatusCode::BAD_REQUEST
                }
                OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::Gateway(_) => StatusCode::BAD_GATEWAY,
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::MissingToken
                | AuthError::InvalidToken(_)
                | AuthError::ExpiredToken
                | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::Issue(_) | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Client-facing message; internal details are never exposed.
    fn client_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Order(err) => match err {
                OrderError::Gateway(_) => "Payment gateway error".to_owned(),
                OrderError::Repository(_) => "Internal server error".to_owned(),
                other => other.to_string(),
            },
            Self::Auth(err) => match err {
                AuthError::MissingToken => "Authentication required".to_owned(),
                AuthError::InvalidToken(_) | AuthError::UserNotFound => {
                    "Invalid or expired token".to_owned()
                }
                AuthError::ExpiredToken => "Token expired".to_owned(),
                AuthError::Forbidden => "Admin access required".to_owned(),
                AuthError::Issue(_) | AuthError::Repository(_) => {
                    "Internal server error".to_owned()
                }
            },
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = Json(json!({
            "success": false,
            "message": self.client_message(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated caller.
///
/// Called by the auth extractor so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ekart_core::DraftError;
    use http_body_util::BodyExt;

    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::Order(OrderError::Invalid(DraftError::EmptyProducts)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Order(OrderError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Order(OrderError::Gateway(RazorpayError::Parse("x".to_owned()))).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Auth(AuthError::MissingToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Auth(AuthError::Forbidden).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::RateLimited(5).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::Internal("boom".to_owned()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_envelope_carries_validation_message() {
        let (status, body) =
            body_json(AppError::Order(OrderError::Invalid(DraftError::EmptyProducts))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "No products in order");
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let (_, body) = body_json(AppError::Internal("connection refused".to_owned())).await;
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_rate_limited_message() {
        let (_, body) = body_json(AppError::RateLimited(42)).await;
        assert_eq!(body["message"], "Too many requests. Try again after 42 seconds.");
    }
}
