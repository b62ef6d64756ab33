//! Hosted authentication.
//!
//! Accounts (principals) are owned by the backend's auth service. The admin
//! console signs users up and in through its REST API and keeps the returned
//! tokens in the server-side session. [`AuthProvider`] is the seam; the
//! production implementation is [`GoTrueClient`].

mod client;
mod error;

pub use client::GoTrueClient;
pub use error::AuthError;

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use dazzle_core::{Email, Principal};

/// Refresh this long before the access token actually expires.
const EXPIRY_SKEW_SECS: i64 = 30;

/// Access and refresh tokens for one signed-in principal.
///
/// Stored in the server-side session only; never sent to the browser.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthTokens {
    /// Whether the access token is expired (or about to be) at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) >= self.expires_at
    }
}

impl std::fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthTokens")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// A principal together with a fresh token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub principal: Principal,
    pub tokens: AuthTokens,
}

/// Result of a sign-up call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    pub principal: Principal,
    /// Present when the auth service signs the new account in immediately
    /// (email confirmation disabled).
    pub tokens: Option<AuthTokens>,
}

/// Operations the admin console needs from the hosted auth service.
pub trait AuthProvider: Send + Sync {
    /// Create a principal. `full_name` is stored in the user metadata and
    /// confirmation emails link back to `redirect_to`.
    fn sign_up(
        &self,
        email: &Email,
        password: &str,
        full_name: &str,
        redirect_to: &Url,
    ) -> impl Future<Output = Result<SignUp, AuthError>> + Send;

    /// Exchange an email/password pair for tokens.
    fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> impl Future<Output = Result<AuthGrant, AuthError>> + Send;

    /// Exchange a refresh token for a new pair.
    fn refresh(&self, refresh_token: &str)
    -> impl Future<Output = Result<AuthGrant, AuthError>> + Send;

    /// Revoke the session behind `access_token`.
    fn sign_out(&self, access_token: &str) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Change the password of the principal behind `access_token`.
    fn update_password(
        &self,
        access_token: &str,
        new_password: &str,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;
}
