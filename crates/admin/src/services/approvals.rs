//! Approval workflow service.
//!
//! Wraps an [`ApprovalStore`] with tracing and maps store outcomes onto
//! [`ApprovalError`]. The store is responsible for atomicity: an approval
//! writes the role grant and the reviewed request together or not at all.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use dazzle_core::{AdminRequest, AdminRequestId, Email, NewAdminRequest, RequestStatus, UserId};

use crate::db::{AdminRequestRepository, BootstrapOutcome, RepositoryError, ReviewOutcome};

/// Errors from approval operations.
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("admin request not found")]
    NotFound,

    #[error("admin request has already been {status}")]
    AlreadyReviewed { status: RequestStatus },

    #[error("reviewer is not an admin")]
    ReviewerNotAdmin,

    #[error("an admin already exists; approve requests from the console")]
    AdminAlreadyExists,

    #[error("no pending request for {0}")]
    NoPendingRequest(String),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ApprovalError {
    /// Notice shown on the approvals page. Store failures get a generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Repository(_) => "Failed to update request".to_owned(),
            other => {
                let mut message = other.to_string();
                if let Some(first) = message.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                message
            }
        }
    }
}

/// Persistence for admin requests and the grants approval creates.
pub trait ApprovalStore: Send + Sync {
    /// All requests, newest first.
    fn list(&self) -> impl Future<Output = Result<Vec<AdminRequest>, RepositoryError>> + Send;

    /// Requests with one status, newest first.
    fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> impl Future<Output = Result<Vec<AdminRequest>, RepositoryError>> + Send;

    fn get(
        &self,
        id: AdminRequestId,
    ) -> impl Future<Output = Result<Option<AdminRequest>, RepositoryError>> + Send;

    /// Insert a pending request.
    fn create(
        &self,
        new: &NewAdminRequest,
    ) -> impl Future<Output = Result<AdminRequest, RepositoryError>> + Send;

    /// Approve and grant admin in one atomic step.
    fn approve(
        &self,
        id: AdminRequestId,
        reviewer: UserId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<ReviewOutcome, RepositoryError>> + Send;

    /// Reject if still pending.
    fn reject(
        &self,
        id: AdminRequestId,
        reviewer: UserId,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<ReviewOutcome, RepositoryError>> + Send;

    /// Count-only query for pending requests.
    fn count_pending(&self) -> impl Future<Output = Result<i64, RepositoryError>> + Send;

    /// Approve the newest pending request for `email` while no admin exists.
    fn bootstrap_first_admin(
        &self,
        email: &Email,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<BootstrapOutcome, RepositoryError>> + Send;
}

/// [`ApprovalStore`] backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgApprovalStore {
    pool: PgPool,
}

impl PgApprovalStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn requests(&self) -> AdminRequestRepository<'_> {
        AdminRequestRepository::new(&self.pool)
    }
}

impl ApprovalStore for PgApprovalStore {
    async fn list(&self) -> Result<Vec<AdminRequest>, RepositoryError> {
        self.requests().list_all().await
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<AdminRequest>, RepositoryError> {
        self.requests().list_by_status(status).await
    }

    async fn get(&self, id: AdminRequestId) -> Result<Option<AdminRequest>, RepositoryError> {
        self.requests().get(id).await
    }

    async fn create(&self, new: &NewAdminRequest) -> Result<AdminRequest, RepositoryError> {
        self.requests().create(new).await
    }

    async fn approve(
        &self,
        id: AdminRequestId,
        reviewer: UserId,
        at: DateTime<Utc>,
    ) -> Result<ReviewOutcome, RepositoryError> {
        self.requests().approve(id, reviewer, at).await
    }

    async fn reject(
        &self,
        id: AdminRequestId,
        reviewer: UserId,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<ReviewOutcome, RepositoryError> {
        self.requests().reject(id, reviewer, reason, at).await
    }

    async fn count_pending(&self) -> Result<i64, RepositoryError> {
        self.requests().count_pending().await
    }

    async fn bootstrap_first_admin(
        &self,
        email: &Email,
        at: DateTime<Utc>,
    ) -> Result<BootstrapOutcome, RepositoryError> {
        self.requests().bootstrap_first_admin(email, at).await
    }
}

/// Approval workflow operations.
pub struct ApprovalService<'a, S> {
    store: &'a S,
}

impl<'a, S: ApprovalStore> ApprovalService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// All requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::Repository` if the read fails.
    pub async fn list(&self) -> Result<Vec<AdminRequest>, ApprovalError> {
        Ok(self.store.list().await?)
    }

    /// Requests with one status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::Repository` if the read fails.
    pub async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<AdminRequest>, ApprovalError> {
        Ok(self.store.list_by_status(status).await?)
    }

    /// Number of pending requests.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::Repository` if the read fails.
    pub async fn pending_count(&self) -> Result<i64, ApprovalError> {
        Ok(self.store.count_pending().await?)
    }

    /// Approve a pending request on behalf of an admin reviewer.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `AlreadyReviewed` or `ReviewerNotAdmin` when the
    /// precondition fails, and `Repository` when the write fails. In every
    /// error case the request keeps its previous status and no grant exists.
    #[instrument(skip(self), fields(request_id = %id, reviewer = %reviewer))]
    pub async fn approve(
        &self,
        id: AdminRequestId,
        reviewer: UserId,
    ) -> Result<AdminRequest, ApprovalError> {
        let outcome = self.store.approve(id, reviewer, Utc::now()).await;
        let approved = Self::reviewed(outcome)?;
        tracing::info!(user_id = %approved.user_id, "Admin request approved, admin role granted");
        Ok(approved)
    }

    /// Reject a pending request. A blank reason is stored as null.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `AlreadyReviewed` when the request is not
    /// pending, and `Repository` when the write fails.
    #[instrument(skip(self, reason), fields(request_id = %id, reviewer = %reviewer))]
    pub async fn reject(
        &self,
        id: AdminRequestId,
        reviewer: UserId,
        reason: Option<&str>,
    ) -> Result<AdminRequest, ApprovalError> {
        let outcome = self.store.reject(id, reviewer, reason, Utc::now()).await;
        let rejected = Self::reviewed(outcome)?;
        tracing::info!(
            user_id = %rejected.user_id,
            has_reason = rejected.rejection_reason.is_some(),
            "Admin request rejected"
        );
        Ok(rejected)
    }

    /// Seed the first admin from a pending request.
    ///
    /// # Errors
    ///
    /// Returns `AdminAlreadyExists` once any admin grant exists,
    /// `NoPendingRequest` if `email` has nothing pending, and `Repository`
    /// when the write fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn bootstrap_first_admin(&self, email: &Email) -> Result<AdminRequest, ApprovalError> {
        match self.store.bootstrap_first_admin(email, Utc::now()).await {
            Ok(BootstrapOutcome::Approved(request)) => {
                tracing::warn!(user_id = %request.user_id, "First admin bootstrapped");
                Ok(request)
            }
            Ok(BootstrapOutcome::AdminAlreadyExists) => Err(ApprovalError::AdminAlreadyExists),
            Ok(BootstrapOutcome::NoPendingRequest) => {
                Err(ApprovalError::NoPendingRequest(email.to_string()))
            }
            Err(e) => {
                tracing::error!(error = %e, "Bootstrap failed");
                Err(e.into())
            }
        }
    }

    fn reviewed(outcome: Result<ReviewOutcome, RepositoryError>) -> Result<AdminRequest, ApprovalError> {
        match outcome {
            Ok(ReviewOutcome::Reviewed(request)) => Ok(request),
            Ok(ReviewOutcome::NotFound) => Err(ApprovalError::NotFound),
            Ok(ReviewOutcome::AlreadyReviewed(status)) => {
                tracing::warn!(%status, "Review attempted on a reviewed request");
                Err(ApprovalError::AlreadyReviewed { status })
            }
            Ok(ReviewOutcome::ReviewerNotAdmin) => {
                tracing::warn!("Review attempted by a non-admin");
                Err(ApprovalError::ReviewerNotAdmin)
            }
            Err(e) => {
                tracing::error!(error = %e, "Review write failed");
                Err(e.into())
            }
        }
    }
}
