//! Admin access registration.
//!
//! Submitting is two writes against two systems: the principal is created by
//! the auth service, then a pending request row is inserted. There is no
//! distributed transaction; if the insert fails the principal is left orphaned
//! and logged for manual cleanup.

use thiserror::Error;
use tracing::instrument;
use url::Url;

use dazzle_core::{AdminRequest, NewAdminRequest, Registration};

use super::approvals::ApprovalStore;
use super::auth::{AuthError, AuthProvider};
use crate::db::RepositoryError;

/// Errors from submitting a registration.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Invalid(#[from] dazzle_core::RegistrationError),

    #[error("sign-up failed: {0}")]
    Auth(#[from] AuthError),

    /// The principal exists but the request row was not written.
    #[error("account created but request not recorded: {0}")]
    RequestNotRecorded(#[source] RepositoryError),
}

impl RegistrationError {
    /// Message for the registration form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Invalid(e) => e.to_string(),
            Self::Auth(e) => e.user_message(),
            Self::RequestNotRecorded(_) => {
                "Your account was created but the request could not be recorded. Please contact an administrator.".to_owned()
            }
        }
    }
}

/// Registration workflow.
pub struct RegistrationService<'a, A, S> {
    auth: &'a A,
    store: &'a S,
    redirect_to: &'a Url,
}

impl<'a, A: AuthProvider, S: ApprovalStore> RegistrationService<'a, A, S> {
    #[must_use]
    pub const fn new(auth: &'a A, store: &'a S, redirect_to: &'a Url) -> Self {
        Self {
            auth,
            store,
            redirect_to,
        }
    }

    /// Sign up a principal and file a pending admin request for it.
    ///
    /// Any session the sign-up opened is signed out again; the user gets in
    /// only after approval.
    ///
    /// # Errors
    ///
    /// Returns `Auth` if sign-up fails (nothing was created) and
    /// `RequestNotRecorded` if the principal was created but the request
    /// insert failed.
    #[instrument(skip_all, fields(email = %registration.email))]
    pub async fn submit(&self, registration: &Registration) -> Result<AdminRequest, RegistrationError> {
        let sign_up = self
            .auth
            .sign_up(
                &registration.email,
                &registration.password,
                &registration.full_name,
                self.redirect_to,
            )
            .await?;
        let user_id = sign_up.principal.id;

        let new = NewAdminRequest {
            user_id,
            full_name: registration.full_name.clone(),
            email: registration.email.clone(),
        };
        let request = match self.store.create(&new).await {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(
                    orphan_user_id = %user_id,
                    error = %e,
                    "Principal created but admin request insert failed; manual cleanup required"
                );
                return Err(RegistrationError::RequestNotRecorded(e));
            }
        };

        if let Some(tokens) = sign_up.tokens
            && let Err(e) = self.auth.sign_out(&tokens.access_token).await
        {
            tracing::warn!(error = %e, "Failed to sign out after registration");
        }

        tracing::info!(request_id = %request.id, %user_id, "Admin request submitted");
        Ok(request)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dazzle_core::RequestStatus;

    use super::*;
    use crate::testing::{FakeAuth, MemoryApprovalStore};

    fn registration() -> Registration {
        Registration::parse("Ann Lee", "ann@x.com", "secret1", "secret1").unwrap()
    }

    fn base_url() -> Url {
        Url::parse("https://admin.dazzle.test").unwrap()
    }

    #[tokio::test]
    async fn test_submit_creates_pending_request() {
        let auth = FakeAuth::new();
        let store = MemoryApprovalStore::new();
        let url = base_url();
        let service = RegistrationService::new(&auth, &store, &url);

        let request = service.submit(&registration()).await.unwrap();

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.full_name, "Ann Lee");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_signs_out_immediate_session() {
        let auth = FakeAuth::new().with_immediate_sessions();
        let store = MemoryApprovalStore::new();
        let url = base_url();
        let service = RegistrationService::new(&auth, &store, &url);

        service.submit(&registration()).await.unwrap();

        assert_eq!(auth.sign_outs(), 1);
    }

    #[tokio::test]
    async fn test_sign_up_failure_writes_nothing() {
        let auth = FakeAuth::new();
        let store = MemoryApprovalStore::new();
        let url = base_url();
        let service = RegistrationService::new(&auth, &store, &url);
        service.submit(&registration()).await.unwrap();

        let err = service.submit(&registration()).await.unwrap_err();

        assert!(matches!(
            err,
            RegistrationError::Auth(AuthError::UserAlreadyRegistered)
        ));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insert_failure_reports_orphan() {
        let auth = FakeAuth::new();
        let store = MemoryApprovalStore::new();
        store.fail_writes(true);
        let url = base_url();
        let service = RegistrationService::new(&auth, &store, &url);

        let err = service.submit(&registration()).await.unwrap_err();

        assert!(matches!(err, RegistrationError::RequestNotRecorded(_)));
        assert_eq!(auth.principal_count(), 1);
    }
}
