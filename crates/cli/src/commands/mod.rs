//! Subcommand implementations.

pub mod admin;
pub mod migrate;
pub mod token;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors shared by commands that talk to the database.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] ekart_core::EmailError),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("No user found for {0}")]
    UserNotFound(String),

    #[error("Token error: {0}")]
    Token(String),
}

/// Connect using `EKART_DATABASE_URL`, falling back to `DATABASE_URL`.
async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("EKART_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CommandError::MissingEnvVar("EKART_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = ekart_api::db::create_pool(&SecretString::from(database_url)).await?;
    Ok(pool)
}
