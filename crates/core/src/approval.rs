//! Admin request state machine.
//!
//! ```text
//! pending ──approve──▶ approved
//!    │
//!    └─────reject────▶ rejected
//! ```
//!
//! Both targets are terminal. The transition methods consume the request and
//! return the reviewed copy; persisting it (together with the role grant on
//! approval) is the store's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AdminRequestId, Email, RequestStatus, Role, UserId};

/// Error returned when a transition is attempted from a terminal state.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("request has already been reviewed ({status})")]
    AlreadyReviewed { status: RequestStatus },
}

/// A request for admin capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRequest {
    pub id: AdminRequestId,
    pub user_id: UserId,
    pub full_name: String,
    pub email: Email,
    pub status: RequestStatus,
    /// `None` while pending, and for the bootstrap approval of the first admin.
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied at registration; everything else is defaulted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAdminRequest {
    pub user_id: UserId,
    pub full_name: String,
    pub email: Email,
}

/// A record conferring a role on a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleGrant {
    pub user_id: UserId,
    pub role: Role,
}

impl RoleGrant {
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }
}

impl AdminRequest {
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Approve the request on behalf of `reviewer`.
    ///
    /// Returns the reviewed request and the grant that must be written with it.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::AlreadyReviewed`] unless the request is pending.
    pub fn approve(
        self,
        reviewer: UserId,
        at: DateTime<Utc>,
    ) -> Result<(Self, RoleGrant), TransitionError> {
        self.mark_approved(Some(reviewer), at)
    }

    /// Approve without a reviewer. Used only to seed the first admin, when no
    /// principal can hold the reviewer role yet.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::AlreadyReviewed`] unless the request is pending.
    pub fn approve_as_bootstrap(
        self,
        at: DateTime<Utc>,
    ) -> Result<(Self, RoleGrant), TransitionError> {
        self.mark_approved(None, at)
    }

    /// Reject the request. Blank reasons are stored as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::AlreadyReviewed`] unless the request is pending.
    pub fn reject(
        self,
        reviewer: UserId,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Self, TransitionError> {
        self.ensure_transition(RequestStatus::Rejected)?;
        Ok(Self {
            status: RequestStatus::Rejected,
            reviewed_by: Some(reviewer),
            reviewed_at: Some(at),
            rejection_reason: normalize_reason(reason),
            ..self
        })
    }

    fn mark_approved(
        self,
        reviewer: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Result<(Self, RoleGrant), TransitionError> {
        self.ensure_transition(RequestStatus::Approved)?;
        let grant = RoleGrant::admin(self.user_id);
        let reviewed = Self {
            status: RequestStatus::Approved,
            reviewed_by: reviewer,
            reviewed_at: Some(at),
            rejection_reason: None,
            ..self
        };
        Ok((reviewed, grant))
    }

    const fn ensure_transition(&self, next: RequestStatus) -> Result<(), TransitionError> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(TransitionError::AlreadyReviewed {
                status: self.status,
            })
        }
    }
}

/// Trim a rejection reason, mapping blank input to `None`.
#[must_use]
pub fn normalize_reason(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(ToOwned::to_owned)
}
