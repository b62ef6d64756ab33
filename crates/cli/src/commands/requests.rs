//! Admin request commands.
//!
//! # Usage
//!
//! ```bash
//! # Every request, newest first
//! dazzle-cli requests list
//!
//! # Pending requests only
//! dazzle-cli requests list -s pending
//!
//! # Grant the first admin
//! dazzle-cli requests bootstrap -e owner@example.com
//! ```
//!
//! `bootstrap` only succeeds while no admin grant exists. After that, requests
//! are reviewed from the approvals page of the console.

use dazzle_admin::services::{ApprovalError, ApprovalService, PgApprovalStore};
use dazzle_core::{AdminRequest, Email, EmailError, RequestStatus};

use super::{ConnectError, connect};

/// Errors from request commands.
#[derive(Debug, thiserror::Error)]
pub enum RequestsError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),
}

/// Print admin requests, optionally limited to one status.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the query fails.
pub async fn list(status: Option<RequestStatus>) -> Result<(), RequestsError> {
    let pool = connect().await?;
    let store = PgApprovalStore::new(pool);
    let service = ApprovalService::new(&store);

    let requests = match status {
        Some(status) => service.list_by_status(status).await?,
        None => service.list().await?,
    };

    tracing::info!("Found {} request(s)", requests.len());

    #[allow(clippy::print_stdout)]
    for request in &requests {
        println!("{}", format_row(request));
    }

    Ok(())
}

/// Approve the pending request for `email` as the first admin.
///
/// # Errors
///
/// Returns an error if an admin already exists, no pending request matches
/// the email, or the database fails.
pub async fn bootstrap(email: &str) -> Result<(), RequestsError> {
    let email = Email::parse(email)?;

    let pool = connect().await?;
    let store = PgApprovalStore::new(pool);
    let request = ApprovalService::new(&store)
        .bootstrap_first_admin(&email)
        .await?;

    tracing::info!(
        "Approved {} ({}); user {} is now an admin",
        request.full_name,
        request.email,
        request.user_id
    );
    Ok(())
}

fn format_row(request: &AdminRequest) -> String {
    format!(
        "{}  {:<8}  {}  {} <{}>",
        request.id,
        request.status.as_str(),
        request.created_at.format("%Y-%m-%d %H:%M"),
        request.full_name,
        request.email,
    )
}
