//! Session-related types for admin authentication.
//!
//! Types stored in the server-side session for authentication state.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use dazzle_core::{AccessDecision, AdminStatus, Principal};

use crate::services::auth::{AuthGrant, AuthTokens};

/// Seconds a role lookup may stay in flight before the guard starts another.
pub const RESOLVE_TIMEOUT_SECS: i64 = 10;

/// Authentication state of one browser session.
///
/// Mutated only through [`SessionStore::apply`](crate::services::SessionStore::apply).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub principal: Principal,
    pub tokens: AuthTokens,
    /// Derived from the role grant table; `Unresolved` until the lookup lands.
    pub admin: AdminStatus,
    /// When the in-flight role lookup started.
    #[serde(default)]
    pub resolving_since: Option<DateTime<Utc>>,
}

impl AuthSession {
    /// Fresh state after a sign-in or refresh; admin status not yet known.
    #[must_use]
    pub fn unresolved(grant: AuthGrant) -> Self {
        Self {
            principal: grant.principal,
            tokens: grant.tokens,
            admin: AdminStatus::Unresolved,
            resolving_since: None,
        }
    }

    /// Whether the status is unresolved with no lookup that could still land.
    ///
    /// A lookup abandoned mid-flight (cancelled request, failed save) leaves
    /// the status unresolved; once it is older than [`RESOLVE_TIMEOUT_SECS`]
    /// the guard resolves again.
    #[must_use]
    pub fn resolution_stalled(&self, now: DateTime<Utc>) -> bool {
        if self.admin.is_resolved() {
            return false;
        }
        self.resolving_since
            .is_none_or(|since| now - since >= Duration::seconds(RESOLVE_TIMEOUT_SECS))
    }

    /// Access guard decision for this session.
    #[must_use]
    pub const fn access(&self) -> AccessDecision {
        AccessDecision::for_session(Some(&self.principal), self.admin)
    }
}

/// Auth state transitions fed into the session store.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(AuthGrant),
    TokenRefreshed(AuthGrant),
    SignedOut,
}

/// Session keys for admin authentication data.
pub mod keys {
    /// Key for the [`AuthSession`](super::AuthSession).
    pub const AUTH: &str = "auth";
}
