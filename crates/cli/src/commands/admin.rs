//! Account role management.
//!
//! Accounts are created by the identity service; these commands only move
//! an existing account between roles.
//!
//! # Usage
//!
//! ```bash
//! ekart-cli admin promote -e admin@example.com
//! ekart-cli admin demote -e admin@example.com
//! ```

use ekart_core::{Email, UserRole};

use super::{CommandError, connect};

/// Set the role of the account with `email`.
///
/// # Errors
///
/// Returns `CommandError` for an invalid email, an unknown account or a
/// database failure.
pub async fn set_role(email: &str, role: UserRole) -> Result<(), CommandError> {
    let email = Email::parse(email)?;
    let pool = connect().await?;

    tracing::info!("Setting role for {} to {}", email.as_str(), role);

    let updated = sqlx::query("UPDATE users SET role = $1, updated_at = NOW() WHERE email = $2")
        .bind(role)
        .bind(email.as_str())
        .execute(&pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(CommandError::UserNotFound(email.into_inner()));
    }

    tracing::info!("Role updated successfully!");
    Ok(())
}
