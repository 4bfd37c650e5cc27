//! Bearer token issuance for operators and local testing.
//!
//! # Usage
//!
//! ```bash
//! ekart-cli token issue -u 3f0c...-uuid --days 1
//! ```
//!
//! # Environment Variables
//!
//! - `EKART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `EKART_JWT_SECRET` - Token signing secret shared with the API

use chrono::Duration;
use secrecy::SecretString;

use ekart_api::db::{Directory, PgDirectory};
use ekart_api::services::TokenService;
use ekart_core::UserId;

use super::{CommandError, connect};

/// Sign a token for an existing account, carrying its current role.
///
/// # Errors
///
/// Returns `CommandError` for a malformed id, an unknown account, a missing
/// secret or a database failure.
pub async fn issue(user_id: &str, days: i64) -> Result<String, CommandError> {
    let user_id: UserId = user_id
        .parse()
        .map_err(|_| CommandError::InvalidUserId(user_id.to_owned()))?;

    let pool = connect().await?;
    let secret = std::env::var("EKART_JWT_SECRET")
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("EKART_JWT_SECRET"))?;

    let user = PgDirectory::new(pool)
        .principal(user_id)
        .await
        .map_err(|e| CommandError::Token(e.to_string()))?
        .ok_or_else(|| CommandError::UserNotFound(user_id.to_string()))?;

    let tokens = TokenService::new(&secret, Duration::days(days.max(1)));
    let token = tokens
        .issue(user.id, user.role)
        .map_err(|e| CommandError::Token(e.to_string()))?;

    tracing::info!("Issued {} token for {}", user.role, user.email.as_str());
    Ok(token)
}
