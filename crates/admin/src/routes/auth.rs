//! Authentication route handlers for admin.
//!
//! Sign-in, sign-out and the admin access registration form. These pages are
//! public; everything else under `/admin` is behind the access guard.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use dazzle_core::{AccessDecision, Email, Registration};

use crate::error::AppError;
use crate::filters;
use crate::middleware::LOGIN_PATH;
use crate::models::AuthEvent;
use crate::services::auth::{AuthError, AuthProvider};
use crate::services::{RegistrationService, SessionStore};
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template)]
#[template(path = "auth/login.html")]
struct LoginTemplate {
    email: String,
    notice: Option<&'static str>,
    error_message: Option<String>,
    signed_in_as: Option<String>,
}

/// Registration page template.
#[derive(Template)]
#[template(path = "auth/register.html")]
struct RegisterTemplate {
    full_name: String,
    email: String,
    error_message: Option<String>,
}

fn render(template: &impl Template) -> Response {
    Html(template.render().unwrap_or_else(|e| {
        tracing::error!("Template render error: {}", e);
        "Internal Server Error".to_string()
    }))
    .into_response()
}

// =============================================================================
// Forms and Query Parameters
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub notice: Option<String>,
}

/// Sign-in form. No `Debug`: carries a password.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Registration form. No `Debug`: carries passwords.
#[derive(Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Text for a `?notice=` code on the login page.
fn notice_text(code: &str) -> Option<&'static str> {
    match code {
        "submitted" => Some(
            "Request submitted! Your admin access request is pending approval. You can sign in once it is approved.",
        ),
        "not_admin" => Some(
            "Your account does not have admin access yet. Sign in again once your request has been approved.",
        ),
        "signed_out" => Some("You have been signed out."),
        _ => None,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, get(login_page).post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/register", get(register_page).post(register))
}

/// Render the login page. Admins already signed in go to the dashboard.
///
/// GET /admin/login
#[instrument(skip(state, session))]
async fn login_page(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    let store = SessionStore::new(&session, state.roles());
    let current = store.current().await?;

    if current.as_ref().is_some_and(|auth| auth.access().is_allowed()) {
        return Ok(Redirect::to("/admin").into_response());
    }

    let template = LoginTemplate {
        email: String::new(),
        notice: query.notice.as_deref().and_then(notice_text),
        error_message: None,
        signed_in_as: current.map(|auth| auth.principal.email.to_string()),
    };
    Ok(render(&template))
}

/// Sign in with email and password.
///
/// POST /admin/login
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let failed = |email: &str, message: String| {
        render(&LoginTemplate {
            email: email.to_owned(),
            notice: None,
            error_message: Some(message),
            signed_in_as: None,
        })
    };

    if form.email.trim().is_empty() || form.password.is_empty() {
        return Ok(failed(&form.email, "Please enter your email and password".to_owned()));
    }
    let Ok(email) = Email::parse(&form.email) else {
        return Ok(failed(&form.email, AuthError::InvalidCredentials.user_message()));
    };

    let grant = match state.auth().sign_in(&email, &form.password).await {
        Ok(grant) => grant,
        Err(e) => {
            if e.is_client_error() {
                tracing::info!(error = %e, "Sign-in rejected");
            } else {
                tracing::error!(error = %e, "Sign-in failed");
            }
            return Ok(failed(&form.email, e.user_message()));
        }
    };

    let store = SessionStore::new(&session, state.roles());
    let state_after = store.apply(AuthEvent::SignedIn(grant)).await?;

    let target = match state_after.map(|auth| auth.access()) {
        Some(AccessDecision::Redirect { not_admin: true }) => "/admin/login?notice=not_admin",
        _ => "/admin",
    };
    Ok(Redirect::to(target).into_response())
}

/// Sign out and clear the session.
///
/// POST /admin/logout
#[instrument(skip_all)]
async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect, AppError> {
    let store = SessionStore::new(&session, state.roles());

    if let Some(auth) = store.current().await?
        && let Err(e) = state.auth().sign_out(&auth.tokens.access_token).await
    {
        // The local session is cleared regardless.
        tracing::warn!(error = %e, "Auth service sign-out failed");
    }

    store.apply(AuthEvent::SignedOut).await?;
    Ok(Redirect::to("/admin/login?notice=signed_out"))
}

/// Render the registration page.
///
/// GET /admin/register
async fn register_page() -> Response {
    render(&RegisterTemplate {
        full_name: String::new(),
        email: String::new(),
        error_message: None,
    })
}

/// Submit an admin access request.
///
/// POST /admin/register
#[instrument(skip_all)]
async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let failed = |message: String| {
        render(&RegisterTemplate {
            full_name: form.full_name.clone(),
            email: form.email.clone(),
            error_message: Some(message),
        })
    };

    let registration = match Registration::parse(
        &form.full_name,
        &form.email,
        &form.password,
        &form.confirm_password,
    ) {
        Ok(registration) => registration,
        Err(e) => return failed(e.to_string()),
    };

    let service = RegistrationService::new(state.auth(), state.approvals(), &state.config().base_url);
    match service.submit(&registration).await {
        Ok(_) => Redirect::to("/admin/login?notice=submitted").into_response(),
        Err(e) => failed(e.user_message()),
    }
}
