//! API route handlers for admin.
//!
//! Endpoints under `/admin/api/` are consumed by page scripts. The access
//! guard answers them with bare status codes instead of redirects.

pub mod approvals;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
pub fn router() -> Router<AppState> {
    Router::new().merge(approvals::router())
}
