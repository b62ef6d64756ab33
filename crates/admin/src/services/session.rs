//! Session store: the single owner of a browser session's auth state.
//!
//! Every auth transition goes through [`SessionStore::apply`]. Sign-in and
//! token refresh persist the new principal with `AdminStatus::Unresolved`
//! first, then look up the role grant and persist the result. Requests that
//! arrive in between see the unresolved state and get the guard placeholder.

use std::future::Future;

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use dazzle_core::{AdminStatus, Role, UserId};

use crate::db::{RepositoryError, UserRoleRepository};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{AuthEvent, AuthSession, session_keys};

/// Errors reading or writing the session record.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session store error: {0}")]
    Store(#[from] tower_sessions::session::Error),
}

/// Role grant lookup used to resolve [`AdminStatus`].
pub trait RoleLookup: Send + Sync {
    /// Whether `user_id` holds the admin role.
    fn is_admin(&self, user_id: UserId) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// [`RoleLookup`] against `public.user_roles`.
#[derive(Clone)]
pub struct PgRoleLookup {
    pool: PgPool,
}

impl PgRoleLookup {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl RoleLookup for PgRoleLookup {
    async fn is_admin(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        UserRoleRepository::new(&self.pool)
            .has_role(user_id, Role::Admin)
            .await
    }
}

/// Per-request handle on the session's auth state.
pub struct SessionStore<'a, R> {
    session: &'a Session,
    roles: &'a R,
}

impl<'a, R: RoleLookup> SessionStore<'a, R> {
    #[must_use]
    pub const fn new(session: &'a Session, roles: &'a R) -> Self {
        Self { session, roles }
    }

    /// The current auth state, if signed in.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session record cannot be read.
    pub async fn current(&self) -> Result<Option<AuthSession>, SessionError> {
        Ok(self.session.get::<AuthSession>(session_keys::AUTH).await?)
    }

    /// Apply an auth transition and return the resulting state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session record cannot be written. Role
    /// lookup failures are not errors: they resolve to `NotAdmin`.
    #[instrument(skip_all, fields(event = event_name(&event)))]
    pub async fn apply(&self, event: AuthEvent) -> Result<Option<AuthSession>, SessionError> {
        match event {
            AuthEvent::SignedIn(grant) => {
                // New identity, new session ID.
                self.session.cycle_id().await?;
                self.resolve(AuthSession::unresolved(grant)).await.map(Some)
            }
            AuthEvent::TokenRefreshed(grant) => {
                self.resolve(AuthSession::unresolved(grant)).await.map(Some)
            }
            AuthEvent::SignedOut => {
                self.session.flush().await?;
                clear_sentry_user();
                Ok(None)
            }
        }
    }

    /// Look up the role grant again for a session whose earlier lookup never
    /// landed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session record cannot be written.
    #[instrument(skip_all, fields(user_id = %state.principal.id))]
    pub async fn resume(&self, state: AuthSession) -> Result<AuthSession, SessionError> {
        self.resolve(state).await
    }

    async fn resolve(&self, mut state: AuthSession) -> Result<AuthSession, SessionError> {
        state.admin = AdminStatus::Unresolved;
        state.resolving_since = Some(Utc::now());
        self.persist(&state).await?;

        let lookup = self.roles.is_admin(state.principal.id).await;
        if let Err(e) = &lookup {
            tracing::warn!(
                user_id = %state.principal.id,
                error = %e,
                "Role lookup failed, treating as not admin"
            );
        }
        state.admin = AdminStatus::from_lookup(&lookup);
        state.resolving_since = None;
        self.persist(&state).await?;

        set_sentry_user(&state.principal);
        tracing::info!(
            user_id = %state.principal.id,
            admin = ?state.admin,
            "Session admin status resolved"
        );
        Ok(state)
    }

    async fn persist(&self, state: &AuthSession) -> Result<(), SessionError> {
        self.session.insert(session_keys::AUTH, state).await?;
        self.session.save().await?;
        Ok(())
    }
}

const fn event_name(event: &AuthEvent) -> &'static str {
    match event {
        AuthEvent::SignedIn(_) => "signed_in",
        AuthEvent::TokenRefreshed(_) => "token_refreshed",
        AuthEvent::SignedOut => "signed_out",
    }
}
