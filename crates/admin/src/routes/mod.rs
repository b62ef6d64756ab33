//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                   - Redirect to /admin
//!
//! # Auth (public)
//! GET  /admin/login                        - Sign-in page (?notice=)
//! POST /admin/login                        - Sign in with email and password
//! POST /admin/logout                       - Sign out
//! GET  /admin/register                     - Admin access request form
//! POST /admin/register                     - Submit a request
//!
//! # Gated by the access guard
//! GET  /admin                              - Dashboard
//! GET  /admin/products                     - Product listing (?q=)
//! GET  /admin/inquiries                    - Inquiry listing (?status=&q=)
//! GET  /admin/approvals                    - Admin requests (?q=&status=)
//! POST /admin/approvals/{id}/approve       - Approve a pending request
//! POST /admin/approvals/{id}/reject        - Reject a pending request
//! GET  /admin/settings                     - Profile
//! POST /admin/settings/password            - Change password
//! GET  /admin/api/approvals/pending-count  - Pending count (SSE)
//!
//! *                                        - Redirect to /admin
//! ```

pub mod api;
pub mod approvals;
pub mod auth;
pub mod dashboard;
pub mod inquiries;
pub mod products;
pub mod settings;

use axum::{Router, response::Redirect, routing::get};

use crate::state::AppState;

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(to_admin))
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(products::router())
        .merge(inquiries::router())
        .merge(approvals::router())
        .merge(settings::router())
        .merge(api::router())
        .fallback(to_admin)
}

/// Root and unknown paths land on the dashboard.
async fn to_admin() -> Redirect {
    Redirect::to("/admin")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use std::sync::Arc;

    use chrono::Utc;
    use dazzle_core::AdminStatus;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

    use super::*;
    use crate::middleware::{LOGIN_PATH, SESSION_COOKIE_NAME};
    use crate::models::{AuthSession, session_keys};
    use crate::testing::{app_state, grant_for};

    fn app() -> Router {
        routes()
            .layer(SessionManagerLayer::new(MemoryStore::default()))
            .with_state(app_state())
    }

    async fn send(method: Method, uri: &str) -> axum::response::Response {
        app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    fn location(response: &axum::response::Response) -> Option<&str> {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn test_root_and_unknown_paths_go_to_dashboard() {
        for uri in ["/", "/nowhere", "/admin/nowhere/else"] {
            let response = send(Method::GET, uri).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), Some("/admin"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_gated_pages_redirect_without_session() {
        for uri in [
            "/admin",
            "/admin/products",
            "/admin/inquiries",
            "/admin/approvals",
            "/admin/settings",
        ] {
            let response = send(Method::GET, uri).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), Some(LOGIN_PATH), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_review_actions_redirect_without_session() {
        let id = dazzle_core::AdminRequestId::generate();
        let response = send(Method::POST, &format!("/admin/approvals/{id}/approve")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some(LOGIN_PATH));
    }

    #[tokio::test]
    async fn test_api_rejects_without_session() {
        let response = send(Method::GET, "/admin/api/approvals/pending-count").await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_public_pages_render() {
        for uri in [LOGIN_PATH, "/admin/register"] {
            let response = send(Method::GET, uri).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    /// Request carrying a stored session whose admin status is `admin`.
    async fn send_signed_in(admin: AdminStatus, uri: &str) -> axum::response::Response {
        let store = MemoryStore::default();
        let session = Session::new(None, Arc::new(store.clone()), None);
        let mut auth = AuthSession::unresolved(grant_for("ann@x.com"));
        auth.admin = admin;
        if admin == AdminStatus::Unresolved {
            auth.resolving_since = Some(Utc::now());
        }
        session.insert(session_keys::AUTH, &auth).await.unwrap();
        session.save().await.unwrap();
        let id = session.id().unwrap();

        routes()
            .layer(SessionManagerLayer::new(store).with_name(SESSION_COOKIE_NAME))
            .with_state(app_state())
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_unresolved_session_sees_placeholder() {
        let response = send_signed_in(AdminStatus::Unresolved, "/admin/settings").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(location(&response), None);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("Checking access"));
        assert!(!body.contains("ann@x.com"));
    }

    #[tokio::test]
    async fn test_non_admin_session_goes_to_login_notice() {
        let response = send_signed_in(AdminStatus::NotAdmin, "/admin/settings").await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/admin/login?notice=not_admin"));
    }

    #[tokio::test]
    async fn test_admin_session_reaches_page() {
        let response = send_signed_in(AdminStatus::Admin, "/admin/settings").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("ann@x.com"));
    }
}
