//! Admin request review routes.
//!
//! The list is fetched whole (newest first) and narrowed by [`RequestFilter`]
//! on every render. Review actions redirect back with a flash code in
//! `?success=` or `?error=`.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{Html, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use dazzle_core::{AdminRequest, AdminRequestId, RequestFilter, RequestStatus, StatusFilter};

use crate::{
    filters,
    middleware::RequireAdmin,
    services::{ApprovalError, ApprovalService},
    state::AppState,
};

use super::dashboard::{AdminUserView, LOAD_ERROR};

const APPROVALS_PATH: &str = "/admin/approvals";

// =============================================================================
// Templates
// =============================================================================

/// Admin request view for templates.
#[derive(Debug, Clone)]
pub struct RequestView {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub status: String,
    pub status_label: String,
    pub is_pending: bool,
    pub created_at: String,
    pub reviewed_at: Option<String>,
    pub rejection_reason: Option<String>,
}

impl From<&AdminRequest> for RequestView {
    fn from(request: &AdminRequest) -> Self {
        Self {
            id: request.id.to_string(),
            full_name: request.full_name.clone(),
            email: request.email.to_string(),
            status: request.status.to_string(),
            status_label: request.status.label().to_string(),
            is_pending: request.is_pending(),
            created_at: request.created_at.format("%b %d, %Y").to_string(),
            reviewed_at: request
                .reviewed_at
                .map(|at| at.format("%b %d, %Y").to_string()),
            rejection_reason: request.rejection_reason.clone(),
        }
    }
}

/// Option in the status filter select.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn status_options(current: StatusFilter) -> Vec<StatusOption> {
    std::iter::once(StatusFilter::All)
        .chain(RequestStatus::ALL.into_iter().map(StatusFilter::Only))
        .map(|filter| StatusOption {
            value: filter.as_str(),
            label: match filter {
                StatusFilter::All => "All statuses",
                StatusFilter::Only(status) => status.label(),
            },
            selected: filter == current,
        })
        .collect()
}

/// Approvals page template.
#[derive(Template)]
#[template(path = "approvals/index.html")]
pub struct ApprovalsTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub pending_count: Option<i64>,
    pub requests: Vec<RequestView>,
    pub total: usize,
    pub search: String,
    pub status_options: Vec<StatusOption>,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

// =============================================================================
// Query Parameters
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ApprovalsQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub status: String,
    pub success: Option<String>,
    pub error: Option<String>,
}

impl ApprovalsQuery {
    /// Filter from the query string; an unknown status shows everything.
    fn filter(&self) -> RequestFilter {
        RequestFilter::new(
            self.q.clone(),
            self.status.parse().unwrap_or_default(),
        )
    }
}

/// Form body for rejecting a request.
#[derive(Debug, Deserialize)]
pub struct RejectForm {
    #[serde(default)]
    pub reason: Option<String>,
}

// =============================================================================
// Flash Codes
// =============================================================================

/// Flash code for a failed review.
const fn error_code(error: &ApprovalError) -> &'static str {
    match error {
        ApprovalError::NotFound => "not_found",
        ApprovalError::AlreadyReviewed { .. } => "already_reviewed",
        ApprovalError::ReviewerNotAdmin => "not_admin",
        ApprovalError::AdminAlreadyExists
        | ApprovalError::NoPendingRequest(_)
        | ApprovalError::Repository(_) => "failed",
    }
}

/// Text for a `?success=` code; unknown codes show nothing.
fn success_message(code: &str) -> Option<String> {
    let text = match code {
        "approved" => "Request approved. The user now has admin access.",
        "rejected" => "Request rejected.",
        _ => return None,
    };
    Some(text.to_owned())
}

/// Text for a `?error=` code; unknown codes show nothing.
fn error_message(code: &str) -> Option<String> {
    let text = match code {
        "not_found" => "That request no longer exists.",
        "already_reviewed" => "That request has already been reviewed.",
        "not_admin" => "Only admins can review requests.",
        "failed" => "Failed to update request. Please try again.",
        _ => return None,
    };
    Some(text.to_owned())
}

fn back_with(key: &str, code: &str) -> Redirect {
    Redirect::to(&format!("{APPROVALS_PATH}?{key}={code}"))
}

// =============================================================================
// Handlers
// =============================================================================

/// Build the approvals router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(APPROVALS_PATH, get(index))
        .route("/admin/approvals/{id}/approve", post(approve))
        .route("/admin/approvals/{id}/reject", post(reject))
}

/// Approvals page handler.
///
/// GET /admin/approvals
#[instrument(skip(auth, state))]
async fn index(
    RequireAdmin(auth): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<ApprovalsQuery>,
) -> Html<String> {
    let filter = query.filter();
    let service = ApprovalService::new(state.approvals());

    let (requests, total, pending_in_list, load_error) = match service.list().await {
        Ok(all) => {
            let pending = all.iter().filter(|r| r.is_pending()).count();
            let visible = filter
                .apply(&all)
                .into_iter()
                .map(RequestView::from)
                .collect();
            (visible, all.len(), Some(pending), None)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch admin requests");
            (vec![], 0, None, Some(LOAD_ERROR.to_string()))
        }
    };

    let pending_count = state
        .pending()
        .current()
        .or_else(|| pending_in_list.and_then(|n| i64::try_from(n).ok()));

    let template = ApprovalsTemplate {
        admin_user: AdminUserView::from(&auth),
        current_path: APPROVALS_PATH.to_string(),
        pending_count,
        requests,
        total,
        search: filter.query.clone(),
        status_options: status_options(filter.status),
        success_message: query.success.as_deref().and_then(success_message),
        error_message: load_error.or_else(|| query.error.as_deref().and_then(error_message)),
    };

    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

/// Approve a pending request.
///
/// POST /admin/approvals/{id}/approve
#[instrument(skip(auth, state), fields(reviewer = %auth.principal.id))]
async fn approve(
    RequireAdmin(auth): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<AdminRequestId>,
) -> Redirect {
    let service = ApprovalService::new(state.approvals());
    match service.approve(id, auth.principal.id).await {
        Ok(_) => back_with("success", "approved"),
        Err(e) => back_with("error", error_code(&e)),
    }
}

/// Reject a pending request with an optional reason.
///
/// POST /admin/approvals/{id}/reject
#[instrument(skip(auth, state, form), fields(reviewer = %auth.principal.id))]
async fn reject(
    RequireAdmin(auth): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<AdminRequestId>,
    Form(form): Form<RejectForm>,
) -> Redirect {
    let service = ApprovalService::new(state.approvals());
    match service
        .reject(id, auth.principal.id, form.reason.as_deref())
        .await
    {
        Ok(_) => back_with("success", "rejected"),
        Err(e) => back_with("error", error_code(&e)),
    }
}
