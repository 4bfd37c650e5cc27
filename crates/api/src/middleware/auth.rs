//! Authentication extractors.
//!
//! Provides extractors for requiring a bearer-authenticated caller in route
//! handlers. The token's subject is re-loaded from the directory on every
//! request, so deleted accounts and demoted admins lose access immediately.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::{AppError, set_sentry_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, bearer_token};
use crate::state::AppState;

/// Extractor that requires a valid bearer token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Extractor that requires a valid bearer token for an admin account.
pub struct RequireAdmin(pub CurrentUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AuthError::MissingToken)?;

        let claims = state.tokens().verify(token)?;

        let user = state
            .directory()
            .principal(claims.sub)
            .await
            .map_err(AuthError::from)?
            .ok_or(AuthError::UserNotFound)?;

        set_sentry_user(&user.id, Some(user.email.as_str()));
        tracing::Span::current().record("user_id", tracing::field::display(user.id));

        Ok(Self(user))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(user) = RequireAuth::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AuthError::Forbidden.into());
        }
        Ok(Self(user))
    }
}
