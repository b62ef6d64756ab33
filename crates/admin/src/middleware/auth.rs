//! Access guard extractor for admin.
//!
//! Every gated handler takes [`RequireAdmin`]. The extractor refreshes an
//! expired token pair, then applies [`AccessDecision`] to the session:
//! `Allow` runs the handler, `Suspend` renders a neutral "checking access"
//! placeholder, `Redirect` sends the browser to the sign-in page.

use askama::Template;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};
use tower_sessions::Session;

use dazzle_core::{AccessDecision, AdminStatus};

use crate::error::set_sentry_user;
use crate::filters;
use crate::models::{AuthEvent, AuthSession};
use crate::services::auth::AuthProvider;
use crate::services::session::{RoleLookup, SessionError, SessionStore};
use crate::state::AppState;

/// Sign-in entry point.
pub const LOGIN_PATH: &str = "/admin/login";

/// Paths under this prefix get bare status codes instead of pages.
pub const API_PREFIX: &str = "/admin/api/";

/// Seconds the placeholder asks the browser to wait before retrying.
const RETRY_AFTER_SECS: &str = "1";

/// Extractor that requires a signed-in admin.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAdmin(auth): RequireAdmin) -> impl IntoResponse {
///     format!("Hello, {}!", auth.principal.display_name())
/// }
/// ```
pub struct RequireAdmin(pub AuthSession);

/// Why a gated request was not served.
#[derive(Debug, PartialEq, Eq)]
pub enum GuardRejection {
    /// Admin status is unresolved.
    Checking { is_api: bool },
    /// No principal, or the principal is not an admin.
    Redirect { not_admin: bool, is_api: bool },
    /// The session record could not be read; fail closed.
    SessionUnavailable,
}

impl GuardRejection {
    /// Rejection for a non-allowing decision, `None` for `Allow`.
    #[must_use]
    pub const fn from_decision(decision: AccessDecision, is_api: bool) -> Option<Self> {
        match decision {
            AccessDecision::Allow => None,
            AccessDecision::Suspend => Some(Self::Checking { is_api }),
            AccessDecision::Redirect { not_admin } => Some(Self::Redirect { not_admin, is_api }),
        }
    }
}

/// Placeholder shown while admin status resolves.
#[derive(Template)]
#[template(path = "guard/checking.html")]
struct CheckingTemplate;

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Checking { is_api: true } => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, RETRY_AFTER_SECS)],
            )
                .into_response(),
            Self::Checking { is_api: false } => {
                let page = CheckingTemplate.render().unwrap_or_else(|e| {
                    tracing::error!("Template render error: {}", e);
                    "Checking access...".to_string()
                });
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    [
                        (header::RETRY_AFTER, RETRY_AFTER_SECS),
                        (header::CACHE_CONTROL, "no-store"),
                    ],
                    Html(page),
                )
                    .into_response()
            }
            Self::Redirect { is_api: true, .. } => StatusCode::UNAUTHORIZED.into_response(),
            Self::Redirect {
                not_admin,
                is_api: false,
            } => Redirect::to(&login_location(not_admin)).into_response(),
            Self::SessionUnavailable => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Where the guard sends a visitor it turns away.
#[must_use]
pub fn login_location(not_admin: bool) -> String {
    if not_admin {
        format!("{LOGIN_PATH}?notice=not_admin")
    } else {
        LOGIN_PATH.to_string()
    }
}

/// Current auth state, refreshing an expired token pair first.
///
/// A failed refresh signs the session out. A status left unresolved by an
/// abandoned lookup is resolved again once the lookup is stale.
///
/// # Errors
///
/// Returns `SessionError` if the session record cannot be read or written.
pub async fn current_session<A, R>(
    store: &SessionStore<'_, R>,
    auth: &A,
    now: DateTime<Utc>,
) -> Result<Option<AuthSession>, SessionError>
where
    A: AuthProvider,
    R: RoleLookup,
{
    let Some(current) = store.current().await? else {
        return Ok(None);
    };

    if current.tokens.is_expired(now) {
        return match auth.refresh(&current.tokens.refresh_token).await {
            Ok(grant) => store.apply(AuthEvent::TokenRefreshed(grant)).await,
            Err(e) => {
                tracing::warn!(
                    user_id = %current.principal.id,
                    error = %e,
                    "Token refresh failed, signing out"
                );
                store.apply(AuthEvent::SignedOut).await
            }
        };
    }

    if current.resolution_stalled(now) {
        tracing::warn!(
            user_id = %current.principal.id,
            "Admin status lookup never completed, resolving again"
        );
        return store.resume(current).await.map(Some);
    }

    Ok(Some(current))
}

/// Guard decision for an optional session.
#[must_use]
pub const fn decide(session: Option<&AuthSession>) -> AccessDecision {
    match session {
        Some(auth) => auth.access(),
        None => AccessDecision::for_session(None, AdminStatus::Unresolved),
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let is_api = parts.uri.path().starts_with(API_PREFIX);

        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(GuardRejection::SessionUnavailable)?;

        let store = SessionStore::new(session, state.roles());
        let current = current_session(&store, state.auth(), Utc::now())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to read session");
                GuardRejection::SessionUnavailable
            })?;

        if let Some(rejection) = GuardRejection::from_decision(decide(current.as_ref()), is_api) {
            tracing::debug!(?rejection, path = %parts.uri.path(), "Access guard turned request away");
            return Err(rejection);
        }

        // Allow implies a principal is present.
        let auth = current.ok_or(GuardRejection::Redirect {
            not_admin: false,
            is_api,
        })?;
        set_sentry_user(&auth.principal);
        Ok(Self(auth))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use dazzle_core::Email;
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::models::session::RESOLVE_TIMEOUT_SECS;
    use crate::services::auth::AuthTokens;
    use crate::testing::{FakeAuth, FakeRoles, grant_for};

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn status_of(rejection: GuardRejection) -> StatusCode {
        rejection.into_response().status()
    }

    #[test]
    fn test_allow_is_not_rejected() {
        assert_eq!(GuardRejection::from_decision(AccessDecision::Allow, false), None);
    }

    #[test]
    fn test_suspend_renders_placeholder_not_redirect() {
        let response = GuardRejection::from_decision(AccessDecision::Suspend, false)
            .unwrap()
            .into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "1");
        assert!(response.headers().get(header::LOCATION).is_none());
    }

    #[test]
    fn test_redirect_targets() {
        let response = GuardRejection::Redirect {
            not_admin: false,
            is_api: false,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/admin/login");

        let response = GuardRejection::Redirect {
            not_admin: true,
            is_api: false,
        }
        .into_response();
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/admin/login?notice=not_admin"
        );
    }

    #[test]
    fn test_api_paths_get_bare_statuses() {
        assert_eq!(
            status_of(GuardRejection::Redirect {
                not_admin: true,
                is_api: true
            }),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(GuardRejection::Checking { is_api: true }),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_no_session_redirects() {
        assert_eq!(decide(None), AccessDecision::Redirect { not_admin: false });
    }

    #[tokio::test]
    async fn test_fresh_tokens_are_kept() {
        let session = session();
        let grant = grant_for("a@x.com");
        let roles = FakeRoles::admins([grant.principal.id]);
        let store = SessionStore::new(&session, &roles);
        store.apply(AuthEvent::SignedIn(grant.clone())).await.unwrap();

        let current = current_session(&store, &FakeAuth::new(), Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(current.tokens, grant.tokens);
        assert_eq!(decide(Some(&current)), AccessDecision::Allow);
    }

    #[tokio::test]
    async fn test_expired_tokens_are_refreshed() {
        let auth = FakeAuth::new();
        let email = Email::parse("a@x.com").unwrap();
        let url = url::Url::parse("https://admin.dazzle.test").unwrap();
        let sign_up = auth.sign_up(&email, "secret1", "Ann", &url).await.unwrap();
        let roles = FakeRoles::admins([sign_up.principal.id]);
        let session = session();
        let store = SessionStore::new(&session, &roles);
        let grant = auth.sign_in(&email, "secret1").await.unwrap();
        store.apply(AuthEvent::SignedIn(grant)).await.unwrap();

        let later = Utc::now() + Duration::hours(2);
        let current = current_session(&store, &auth, later).await.unwrap().unwrap();

        assert_eq!(current.admin, AdminStatus::Admin);
    }

    #[tokio::test]
    async fn test_failed_refresh_signs_out() {
        let session = session();
        let mut grant = grant_for("gone@x.com");
        grant.tokens = AuthTokens {
            expires_at: Utc::now() - Duration::minutes(5),
            ..grant.tokens
        };
        let roles = FakeRoles::admins([grant.principal.id]);
        let store = SessionStore::new(&session, &roles);
        store.apply(AuthEvent::SignedIn(grant)).await.unwrap();

        let current = current_session(&store, &FakeAuth::new(), Utc::now())
            .await
            .unwrap();

        assert_eq!(current, None);
        assert_eq!(store.current().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_abandoned_lookup_is_resolved_again_once_stale() {
        let session = session();
        let grant = grant_for("a@x.com");
        let user = grant.principal.id;

        let hanging = FakeRoles::hanging();
        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            SessionStore::new(&session, &hanging).apply(AuthEvent::SignedIn(grant)),
        )
        .await;
        assert!(cancelled.is_err());

        let roles = FakeRoles::admins([user]);
        let store = SessionStore::new(&session, &roles);
        let auth = FakeAuth::new();

        // The abandoned lookup might still land: keep showing the placeholder.
        let current = current_session(&store, &auth, Utc::now()).await.unwrap();
        assert_eq!(decide(current.as_ref()), AccessDecision::Suspend);

        let later = Utc::now() + Duration::seconds(RESOLVE_TIMEOUT_SECS + 1);
        for _ in 0..3 {
            let current = current_session(&store, &auth, later).await.unwrap();
            assert_eq!(decide(current.as_ref()), AccessDecision::Allow);
        }
        assert_eq!(
            store.current().await.unwrap().unwrap().admin,
            AdminStatus::Admin
        );
    }
}
