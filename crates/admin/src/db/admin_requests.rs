//! Admin request repository.
//!
//! Reviews are the only writes after creation. `approve` and
//! `bootstrap_first_admin` lock the request row and write the role grant and
//! the reviewed request in one transaction; `reject` is a single conditional
//! update.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use dazzle_core::{
    AdminRequest, AdminRequestId, Email, NewAdminRequest, RequestStatus, Role, TransitionError,
    UserId, normalize_reason,
};

use super::{RepositoryError, user_roles};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `public.admin_requests` queries.
#[derive(Debug, sqlx::FromRow)]
struct AdminRequestRow {
    id: Uuid,
    user_id: Uuid,
    full_name: String,
    email: String,
    status: String,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AdminRequestRow> for AdminRequest {
    type Error = RepositoryError;

    fn try_from(row: AdminRequestRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let status = row
            .status
            .parse::<RequestStatus>()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: AdminRequestId::new(row.id),
            user_id: UserId::new(row.user_id),
            full_name: row.full_name,
            email,
            status,
            reviewed_by: row.reviewed_by.map(UserId::new),
            reviewed_at: row.reviewed_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a review attempt that reached the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// The request was pending and is now reviewed.
    Reviewed(AdminRequest),
    /// No request with that ID.
    NotFound,
    /// The request was already approved or rejected; nothing was written.
    AlreadyReviewed(RequestStatus),
    /// The reviewer does not hold the admin role; nothing was written.
    ReviewerNotAdmin,
}

/// Result of seeding the first admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Approved(AdminRequest),
    /// An admin grant already exists; bootstrap is closed.
    AdminAlreadyExists,
    /// No pending request for that email.
    NoPendingRequest,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for admin request database operations.
pub struct AdminRequestRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRequestRepository<'a> {
    /// Create a new admin request repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list_all(&self) -> Result<Vec<AdminRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminRequestRow>(
            r"
            SELECT id, user_id, full_name, email, status,
                   reviewed_by, reviewed_at, rejection_reason, created_at
            FROM public.admin_requests
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// List requests with the given status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<AdminRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminRequestRow>(
            r"
            SELECT id, user_id, full_name, email, status,
                   reviewed_by, reviewed_at, rejection_reason, created_at
            FROM public.admin_requests
            WHERE status = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(status.as_str())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a request by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the data is invalid.
    pub async fn get(&self, id: AdminRequestId) -> Result<Option<AdminRequest>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRequestRow>(
            r"
            SELECT id, user_id, full_name, email, status,
                   reviewed_by, reviewed_at, rejection_reason, created_at
            FROM public.admin_requests
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Insert a new pending request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewAdminRequest) -> Result<AdminRequest, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRequestRow>(
            r"
            INSERT INTO public.admin_requests (user_id, full_name, email, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id, user_id, full_name, email, status,
                      reviewed_by, reviewed_at, rejection_reason, created_at
            ",
        )
        .bind(new.user_id)
        .bind(&new.full_name)
        .bind(new.email.as_str())
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Count-only query for pending requests.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_pending(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM public.admin_requests WHERE status = 'pending'",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }

    /// Approve a pending request and grant the admin role, atomically.
    ///
    /// The request row is locked for the duration of the transaction, so two
    /// concurrent approvals serialize and the second sees `AlreadyReviewed`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if any statement fails; nothing is written.
    pub async fn approve(
        &self,
        id: AdminRequestId,
        reviewer: UserId,
        at: DateTime<Utc>,
    ) -> Result<ReviewOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let Some(request) = lock_request(&mut tx, id).await? else {
            return Ok(ReviewOutcome::NotFound);
        };
        if !user_roles::has_role_in(&mut tx, reviewer, Role::Admin).await? {
            return Ok(ReviewOutcome::ReviewerNotAdmin);
        }
        let (approved, grant) = match request.approve(reviewer, at) {
            Ok(reviewed) => reviewed,
            Err(TransitionError::AlreadyReviewed { status }) => {
                return Ok(ReviewOutcome::AlreadyReviewed(status));
            }
        };

        user_roles::insert_grant(&mut tx, &grant).await?;
        save_review(&mut tx, &approved).await?;
        tx.commit().await?;

        Ok(ReviewOutcome::Reviewed(approved))
    }

    /// Reject a pending request.
    ///
    /// A blank reason is stored as `NULL`. If the row is not pending nothing is
    /// written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the update fails.
    pub async fn reject(
        &self,
        id: AdminRequestId,
        reviewer: UserId,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<ReviewOutcome, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRequestRow>(
            r"
            UPDATE public.admin_requests
            SET status = 'rejected',
                reviewed_by = $2,
                reviewed_at = $3,
                rejection_reason = $4
            WHERE id = $1 AND status = 'pending'
            RETURNING id, user_id, full_name, email, status,
                      reviewed_by, reviewed_at, rejection_reason, created_at
            ",
        )
        .bind(id)
        .bind(reviewer)
        .bind(at)
        .bind(normalize_reason(reason))
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(ReviewOutcome::Reviewed(row.try_into()?));
        }
        Ok(match self.get(id).await? {
            Some(existing) => ReviewOutcome::AlreadyReviewed(existing.status),
            None => ReviewOutcome::NotFound,
        })
    }

    /// Approve the newest pending request for `email` without a reviewer.
    ///
    /// Only allowed while no admin grant exists. The grant table is locked so
    /// two bootstraps cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if any statement fails; nothing is written.
    pub async fn bootstrap_first_admin(
        &self,
        email: &Email,
        at: DateTime<Utc>,
    ) -> Result<BootstrapOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("LOCK TABLE public.user_roles IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;
        if user_roles::any_with_role_in(&mut tx, Role::Admin).await? {
            return Ok(BootstrapOutcome::AdminAlreadyExists);
        }

        let row = sqlx::query_as::<_, AdminRequestRow>(
            r"
            SELECT id, user_id, full_name, email, status,
                   reviewed_by, reviewed_at, rejection_reason, created_at
            FROM public.admin_requests
            WHERE lower(email) = lower($1) AND status = 'pending'
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        let Some(request) = row.map(AdminRequest::try_from).transpose()? else {
            return Ok(BootstrapOutcome::NoPendingRequest);
        };

        let (approved, grant) = request
            .approve_as_bootstrap(at)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;
        user_roles::insert_grant(&mut tx, &grant).await?;
        save_review(&mut tx, &approved).await?;
        tx.commit().await?;

        Ok(BootstrapOutcome::Approved(approved))
    }
}

/// Fetch a request with `FOR UPDATE`.
async fn lock_request(
    conn: &mut PgConnection,
    id: AdminRequestId,
) -> Result<Option<AdminRequest>, RepositoryError> {
    let row = sqlx::query_as::<_, AdminRequestRow>(
        r"
        SELECT id, user_id, full_name, email, status,
               reviewed_by, reviewed_at, rejection_reason, created_at
        FROM public.admin_requests
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(TryInto::try_into).transpose()
}

/// Write the review stamp of a request locked by [`lock_request`].
async fn save_review(conn: &mut PgConnection, request: &AdminRequest) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE public.admin_requests
        SET status = $2, reviewed_by = $3, reviewed_at = $4, rejection_reason = $5
        WHERE id = $1 AND status = 'pending'
        ",
    )
    .bind(request.id)
    .bind(request.status.as_str())
    .bind(request.reviewed_by)
    .bind(request.reviewed_at)
    .bind(request.rejection_reason.as_deref())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() != 1 {
        return Err(RepositoryError::Conflict(format!(
            "admin request {} changed during review",
            request.id
        )));
    }
    Ok(())
}
