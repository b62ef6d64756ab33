//! Inquiry listing route handler.

use askama::Template;
use axum::{
    Router,
    extract::{Query, State},
    response::Html,
    routing::get,
};
use serde::Deserialize;
use tracing::instrument;

use dazzle_core::InquiryStatus;

use crate::{
    db::{Inquiry, InquiryRepository},
    filters,
    middleware::RequireAdmin,
    state::AppState,
};

use super::dashboard::{AdminUserView, LOAD_ERROR};

/// Inquiry view for templates.
#[derive(Debug, Clone)]
pub struct InquiryView {
    pub name: String,
    pub email: String,
    pub mailto: Option<String>,
    pub phone: String,
    pub company: String,
    pub product_interest: String,
    pub quantity: String,
    pub message: String,
    pub status: String,
    pub priority: String,
    pub created_at: String,
}

impl From<&Inquiry> for InquiryView {
    fn from(inquiry: &Inquiry) -> Self {
        Self {
            name: inquiry.name.clone(),
            email: inquiry.email.clone(),
            mailto: inquiry
                .has_valid_email()
                .then(|| format!("mailto:{}", inquiry.email)),
            phone: inquiry.phone.clone().unwrap_or_else(|| "-".to_string()),
            company: inquiry.company.clone().unwrap_or_else(|| "-".to_string()),
            product_interest: inquiry
                .product_interest
                .clone()
                .unwrap_or_else(|| "-".to_string()),
            quantity: inquiry
                .quantity
                .map_or_else(|| "-".to_string(), |q| q.to_string()),
            message: inquiry.message.clone(),
            status: inquiry.status.to_string(),
            priority: inquiry.priority.clone().unwrap_or_else(|| "normal".to_string()),
            created_at: inquiry.created_at.format("%b %d, %Y %H:%M").to_string(),
        }
    }
}

/// Status tab for the filter bar.
#[derive(Debug, Clone)]
pub struct StatusTab {
    pub value: &'static str,
    pub selected: bool,
}

/// Inquiries list template.
#[derive(Template)]
#[template(path = "inquiries/index.html")]
pub struct InquiriesIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub pending_count: Option<i64>,
    pub inquiries: Vec<InquiryView>,
    pub statuses: Vec<StatusTab>,
    pub status: String,
    pub search: String,
    pub error_message: Option<String>,
}

/// Query parameters for the inquiries list.
#[derive(Debug, Default, Deserialize)]
pub struct InquiriesQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub status: String,
}

impl InquiriesQuery {
    /// Status filter; blank, `all` and unknown values select everything.
    fn status_filter(&self) -> Option<InquiryStatus> {
        match self.status.trim() {
            "" | "all" => None,
            other => other.parse().ok(),
        }
    }
}

/// Build the inquiries router.
pub fn router() -> Router<AppState> {
    Router::new().route("/admin/inquiries", get(index))
}

/// Inquiries list page handler.
///
/// GET /admin/inquiries
#[instrument(skip(auth, state))]
async fn index(
    RequireAdmin(auth): RequireAdmin,
    State(state): State<AppState>,
    Query(query): Query<InquiriesQuery>,
) -> Html<String> {
    let status = query.status_filter();

    let (inquiries, error_message) = match InquiryRepository::new(state.pool()).list(status).await {
        Ok(rows) => (
            rows.iter()
                .filter(|i| i.matches_search(&query.q))
                .map(InquiryView::from)
                .collect(),
            None,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch inquiries");
            (vec![], Some(LOAD_ERROR.to_string()))
        }
    };

    let statuses = InquiryStatus::ALL
        .into_iter()
        .map(|s| StatusTab {
            value: s.as_str(),
            selected: status == Some(s),
        })
        .collect();

    let template = InquiriesIndexTemplate {
        admin_user: AdminUserView::from(&auth),
        current_path: "/admin/inquiries".to_string(),
        pending_count: state.pending().current(),
        inquiries,
        statuses,
        status: status.map_or("all", InquiryStatus::as_str).to_string(),
        search: query.q,
        error_message,
    };

    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
}
