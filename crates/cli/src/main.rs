//! Dazzle CLI - database migrations and admin request management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! dazzle-cli migrate
//!
//! # List admin requests, optionally by status
//! dazzle-cli requests list --status pending
//!
//! # Approve the first admin when no admin exists yet
//! dazzle-cli requests bootstrap -e owner@example.com
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use dazzle_core::RequestStatus;

mod commands;

#[derive(Parser)]
#[command(name = "dazzle-cli")]
#[command(author, version, about = "Dazzle Admin CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Inspect and bootstrap admin requests
    Requests {
        #[command(subcommand)]
        action: RequestsAction,
    },
}

#[derive(Subcommand)]
enum RequestsAction {
    /// List admin requests, newest first
    List {
        /// Only show requests with this status (`pending`, `approved`, `rejected`)
        #[arg(short, long)]
        status: Option<RequestStatus>,
    },
    /// Approve the pending request for an email while no admin exists
    Bootstrap {
        /// Email address on the pending request
        #[arg(short, long)]
        email: String,
    },
}

#[tokio::main]
async fn main() {
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
        Commands::Requests { action } => match action {
            RequestsAction::List { status } => commands::requests::list(status).await?,
            RequestsAction::Bootstrap { email } => commands::requests::bootstrap(&email).await?,
        },
    }
    Ok(())
}
