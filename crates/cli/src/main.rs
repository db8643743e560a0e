//! Loyalty CLI - database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply migrations/ to DATABASE_URL
//! loyalty-cli migrate
//!
//! # Produce a PASSWORD_HASH value
//! loyalty-cli hash-password 'front desk password'
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "loyalty-cli")]
#[command(author, version, about = "Loyalty API operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations against `DATABASE_URL`
    Migrate,
    /// Print the `PASSWORD_HASH` value for a password
    HashPassword {
        /// The staff password, exactly as it will be typed
        password: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt().with_target(false).init();

    match Cli::parse().command {
        Commands::Migrate => match commands::migrate::run().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!(error = %err, "Migration failed");
                ExitCode::FAILURE
            }
        },
        Commands::HashPassword { password } => {
            commands::password::hash(&password);
            ExitCode::SUCCESS
        }
    }
}
