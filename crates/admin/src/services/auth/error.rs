//! Hosted auth API error types.

use thiserror::Error;

/// Errors returned by an [`AuthProvider`](super::AuthProvider).
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Email/password pair was rejected.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The account exists but its email address has not been confirmed.
    #[error("email address has not been confirmed")]
    EmailNotConfirmed,

    /// Sign-up for an address that is already registered.
    #[error("an account with this email already exists")]
    UserAlreadyRegistered,

    /// The auth service rejected the password.
    #[error("password rejected: {0}")]
    WeakPassword(String),

    /// The refresh token is no longer valid; the user must sign in again.
    #[error("session expired")]
    SessionExpired,

    /// Too many requests.
    #[error("rate limited by auth service")]
    RateLimited,

    /// Any other non-success response.
    #[error("auth API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),
}

impl AuthError {
    /// Message safe to show on a form. Transport and parse failures collapse to
    /// a generic notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials
            | Self::EmailNotConfirmed
            | Self::UserAlreadyRegistered
            | Self::SessionExpired => {
                let mut message = self.to_string();
                if let Some(first) = message.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                message
            }
            Self::WeakPassword(reason) => reason.clone(),
            Self::RateLimited => "Too many attempts, please wait a moment".to_owned(),
            Self::Http(_) | Self::Api { .. } | Self::Parse(_) => {
                "Something went wrong, please try again".to_owned()
            }
        }
    }

    /// Whether this is the caller's fault (bad input) rather than an outage.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials
                | Self::EmailNotConfirmed
                | Self::UserAlreadyRegistered
                | Self::WeakPassword(_)
                | Self::SessionExpired
        )
    }
}
