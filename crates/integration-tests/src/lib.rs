//! Integration tests for Dazzle Admin.
//!
//! # Running Tests
//!
//! Database tests are ignored by default. Each one runs against a fresh
//! database created by `sqlx::test` with the admin migrations applied, so
//! `DATABASE_URL` must point at a server where the role may create databases.
//!
//! ```bash
//! DATABASE_URL=postgres://postgres@localhost cargo test -p dazzle-integration-tests -- --ignored
//! ```

use dazzle_core::{Email, NewAdminRequest, UserId};
use sqlx::PgPool;

/// Insert an admin grant for a fresh principal and return its ID.
///
/// # Panics
///
/// Panics if the insert fails.
pub async fn seed_admin(pool: &PgPool) -> UserId {
    let user_id = UserId::generate();
    sqlx::query("INSERT INTO public.user_roles (user_id, role) VALUES ($1, 'admin')")
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap_or_else(|e| panic!("failed to seed admin: {e}"));
    user_id
}

/// A registration for a fresh principal.
///
/// # Panics
///
/// Panics if `email` is not a valid address.
#[must_use]
pub fn new_request(full_name: &str, email: &str) -> NewAdminRequest {
    NewAdminRequest {
        user_id: UserId::generate(),
        full_name: full_name.to_owned(),
        email: Email::parse(email).unwrap_or_else(|e| panic!("bad test email: {e}")),
    }
}

/// Number of admin grants held by `user_id`.
///
/// # Panics
///
/// Panics if the query fails.
pub async fn grant_count(pool: &PgPool, user_id: UserId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM public.user_roles WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap_or_else(|e| panic!("failed to count grants: {e}"))
}
