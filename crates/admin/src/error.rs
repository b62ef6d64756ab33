//! Unified error handling for admin.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use dazzle_core::Principal;

use crate::services::SessionError;

/// Application-level error type for the admin console.
///
/// Page handlers report expected failures (bad credentials, failed reviews)
/// as notices on the page; only failures that leave nothing to render reach
/// this type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Session record could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        (status, "Internal server error").into_response()
    }
}

/// Set the Sentry user context from the signed-in principal.
pub fn set_sentry_user(principal: &Principal) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(principal.id.to_string()),
            email: Some(principal.email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
