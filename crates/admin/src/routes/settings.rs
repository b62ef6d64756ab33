//! Admin settings routes.
//!
//! Profile details for the signed-in principal and password change through
//! the hosted auth service.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::instrument;

use dazzle_core::{PasswordChange, Role};

use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::AuthSession;
use crate::services::auth::AuthProvider;
use crate::state::AppState;

use super::dashboard::AdminUserView;

const SETTINGS_PATH: &str = "/admin/settings";

// =============================================================================
// Templates
// =============================================================================

/// Profile facts shown on the settings page.
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub full_name: String,
    pub email: String,
    pub account_id: String,
    pub role: &'static str,
    pub email_verified: bool,
    pub last_sign_in: String,
    pub created: String,
}

fn format_timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "Unknown".to_owned(),
        |at| at.format("%b %d, %Y %H:%M UTC").to_string(),
    )
}

impl From<&AuthSession> for ProfileView {
    fn from(auth: &AuthSession) -> Self {
        let principal = &auth.principal;
        Self {
            full_name: principal.full_name.clone().unwrap_or_default(),
            email: principal.email.to_string(),
            account_id: principal.id.to_string(),
            role: Role::Admin.as_str(),
            email_verified: principal.email_verified,
            last_sign_in: format_timestamp(principal.last_sign_in_at),
            created: format_timestamp(principal.created_at),
        }
    }
}

/// Settings page template.
#[derive(Template)]
#[template(path = "settings/index.html")]
pub struct SettingsTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub pending_count: Option<i64>,
    pub profile: ProfileView,
    pub success_message: Option<String>,
    pub error_message: Option<String>,
}

// =============================================================================
// Query Parameters
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SettingsQueryParams {
    pub success: Option<String>,
}

/// Text for a `?success=` code; unknown codes show nothing.
fn success_text(code: &str) -> Option<String> {
    match code {
        "password_updated" => Some("Your password has been updated.".to_owned()),
        _ => None,
    }
}

/// Password change form. No `Debug`: carries passwords.
#[derive(Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Build the settings router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(SETTINGS_PATH, get(settings_page))
        .route("/admin/settings/password", post(change_password))
}

// =============================================================================
// Handlers
// =============================================================================

fn render_page(
    state: &AppState,
    auth: &AuthSession,
    success_message: Option<String>,
    error_message: Option<String>,
) -> Html<String> {
    let template = SettingsTemplate {
        admin_user: AdminUserView::from(auth),
        current_path: SETTINGS_PATH.to_owned(),
        pending_count: state.pending().current(),
        profile: ProfileView::from(auth),
        success_message,
        error_message,
    };

    Html(
        template
            .render()
            .unwrap_or_else(|e| format!("Template error: {e}")),
    )
}

/// Render the settings page.
///
/// GET /admin/settings
#[instrument(skip(state, auth))]
async fn settings_page(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Query(params): Query<SettingsQueryParams>,
) -> Html<String> {
    let success_message = params.success.as_deref().and_then(success_text);
    render_page(&state, &auth, success_message, None)
}

/// Change the signed-in principal's password.
///
/// Validation and auth service errors re-render the page with the error.
///
/// POST /admin/settings/password
#[instrument(skip_all, fields(user_id = %auth.principal.id))]
async fn change_password(
    State(state): State<AppState>,
    RequireAdmin(auth): RequireAdmin,
    Form(form): Form<PasswordForm>,
) -> Response {
    let change = match PasswordChange::parse(&form.new_password, &form.confirm_password) {
        Ok(change) => change,
        Err(e) => return render_page(&state, &auth, None, Some(e.to_string())).into_response(),
    };

    match state
        .auth()
        .update_password(&auth.tokens.access_token, &change.new_password)
        .await
    {
        Ok(()) => {
            tracing::info!("Password updated");
            Redirect::to("/admin/settings?success=password_updated").into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Password update failed");
            render_page(&state, &auth, None, Some(e.user_message())).into_response()
        }
    }
}
