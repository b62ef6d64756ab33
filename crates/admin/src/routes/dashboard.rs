//! Dashboard route handler.

use askama::Template;
use axum::{
    Router,
    extract::State,
    response::Html,
    routing::get,
};
use tracing::instrument;

use crate::{
    db::{Inquiry, InquiryRepository, ProductRepository},
    filters,
    middleware::RequireAdmin,
    models::AuthSession,
    services::{ApprovalError, ApprovalService},
    state::AppState,
};

use dazzle_core::InquiryStatus;

/// Number of inquiries shown on the dashboard.
const RECENT_INQUIRIES: i64 = 5;

/// Notice shown when a read fails.
pub const LOAD_ERROR: &str = "Failed to load data. Refresh to try again.";

/// Signed-in admin view for templates.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub name: String,
    pub email: String,
}

impl From<&AuthSession> for AdminUserView {
    fn from(auth: &AuthSession) -> Self {
        Self {
            name: auth.principal.display_name().to_owned(),
            email: auth.principal.email.to_string(),
        }
    }
}

/// Dashboard counters, already formatted.
#[derive(Debug, Clone)]
pub struct DashboardMetrics {
    pub total_products: String,
    pub active_products: String,
    pub total_inquiries: String,
    pub new_inquiries: String,
    pub pending_requests: String,
}

/// Inquiry row on the dashboard.
#[derive(Debug, Clone)]
pub struct RecentInquiryView {
    pub name: String,
    pub email: String,
    pub product_interest: String,
    pub status: String,
    pub created_at: String,
}

impl From<&Inquiry> for RecentInquiryView {
    fn from(inquiry: &Inquiry) -> Self {
        Self {
            name: inquiry.name.clone(),
            email: inquiry.email.clone(),
            product_interest: inquiry.product_interest.clone().unwrap_or_default(),
            status: inquiry.status.to_string(),
            created_at: inquiry.created_at.format("%b %d, %Y").to_string(),
        }
    }
}

/// Dashboard template.
#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub pending_count: Option<i64>,
    pub metrics: DashboardMetrics,
    pub recent_inquiries: Vec<RecentInquiryView>,
    pub error_message: Option<String>,
}

/// Build the dashboard router.
pub fn router() -> Router<AppState> {
    Router::new().route("/admin", get(dashboard))
}

/// Format a count, or a dash when it failed to load.
fn count_or_dash<E: std::fmt::Display>(label: &str, result: Result<i64, E>, failed: &mut bool) -> String {
    match result {
        Ok(count) => count.to_string(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to count {label}");
            *failed = true;
            "-".to_string()
        }
    }
}

/// Dashboard page handler.
///
/// GET /admin
#[instrument(skip(auth, state))]
pub async fn dashboard(RequireAdmin(auth): RequireAdmin, State(state): State<AppState>) -> Html<String> {
    let products = ProductRepository::new(state.pool());
    let inquiries = InquiryRepository::new(state.pool());
    let approvals = ApprovalService::new(state.approvals());

    let (total_products, active_products, total_inquiries, new_inquiries, pending, recent) = tokio::join!(
        products.count_all(),
        products.count_active(),
        inquiries.count_all(),
        inquiries.count_with_status(InquiryStatus::New),
        approvals.pending_count(),
        inquiries.recent(RECENT_INQUIRIES),
    );

    let mut failed = false;
    let metrics = DashboardMetrics {
        total_products: count_or_dash("products", total_products, &mut failed),
        active_products: count_or_dash("active products", active_products, &mut failed),
        total_inquiries: count_or_dash("inquiries", total_inquiries, &mut failed),
        new_inquiries: count_or_dash("new inquiries", new_inquiries, &mut failed),
        pending_requests: count_or_dash::<ApprovalError>("pending requests", pending, &mut failed),
    };

    let recent_inquiries = match recent {
        Ok(rows) => rows.iter().map(RecentInquiryView::from).collect(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch recent inquiries");
            failed = true;
            vec![]
        }
    };

    let template = DashboardTemplate {
        admin_user: AdminUserView::from(&auth),
        current_path: "/admin".to_string(),
        pending_count: state.pending().current(),
        metrics,
        recent_inquiries,
        error_message: failed.then(|| LOAD_ERROR.to_string()),
    };

    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_or_dash_flags_failures() {
        let mut failed = false;
        assert_eq!(count_or_dash::<String>("x", Ok(7), &mut failed), "7");
        assert!(!failed);

        assert_eq!(
            count_or_dash("x", Err("boom".to_string()), &mut failed),
            "-"
        );
        assert!(failed);
    }
}
