//! Database operations against the hosted backend's `PostgreSQL`.
//!
//! ## Tables
//!
//! - `public.admin_requests` - Requests for admin access (pending/approved/rejected)
//! - `public.user_roles` - Role grants, unique per `(user_id, role)`
//! - `public.products` - Product catalog (read-only here)
//! - `public.inquiries` - Customer inquiries (read-only here)
//! - `admin.session` - Browser session storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p dazzle-cli -- migrate
//! ```

pub mod admin_requests;
pub mod inquiries;
pub mod products;
pub mod user_roles;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_requests::{AdminRequestRepository, BootstrapOutcome, ReviewOutcome};
pub use inquiries::{Inquiry, InquiryRepository};
pub use products::{Product, ProductRepository};
pub use user_roles::UserRoleRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Constraint violation (e.g., duplicate role grant).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
