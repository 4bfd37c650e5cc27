//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! ekart-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `EKART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/api/migrations/` and are embedded at compile time.

use super::{CommandError, connect};

/// Run pending migrations.
///
/// # Errors
///
/// Returns `CommandError` if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
