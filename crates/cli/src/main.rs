//! Ekart CLI - Database migrations and account management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ekart-cli migrate
//!
//! # Grant or revoke admin access
//! ekart-cli admin promote -e admin@example.com
//! ekart-cli admin demote -e admin@example.com
//!
//! # Sign a bearer token for an existing account
//! ekart-cli token issue -u <user-uuid>
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use ekart_core::UserRole;

mod commands;

#[derive(Parser)]
#[command(name = "ekart-cli")]
#[command(author, version, about = "Ekart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage admin access
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Manage bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Grant the admin role to an existing account
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Return an admin account to the user role
    Demote {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a bearer token for an existing account
    Issue {
        /// Account id (UUID)
        #[arg(short, long)]
        user_id: String,

        /// Token lifetime in days
        #[arg(short, long, default_value_t = 7)]
        days: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Promote { email } => {
                commands::admin::set_role(&email, UserRole::Admin).await?;
            }
            AdminAction::Demote { email } => {
                commands::admin::set_role(&email, UserRole::User).await?;
            }
        },
        Commands::Token { action } => match action {
            TokenAction::Issue { user_id, days } => {
                let token = commands::token::issue(&user_id, days).await?;
                #[allow(clippy::print_stdout)]
                {
                    println!("{token}");
                }
            }
        },
    }
    Ok(())
}
