//! Role grant repository.
//!
//! Grants are only ever inserted (by approval or bootstrap); nothing here
//! updates or deletes them.

use sqlx::{PgConnection, PgPool};

use dazzle_core::{Role, RoleGrant, UserId};

use super::RepositoryError;

/// Repository for role grant lookups.
pub struct UserRoleRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRoleRepository<'a> {
    /// Create a new user role repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Whether `user_id` holds `role`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_role(&self, user_id: UserId, role: Role) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM public.user_roles WHERE user_id = $1 AND role = $2
            )
            ",
        )
        .bind(user_id)
        .bind(role.as_str())
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}

/// [`UserRoleRepository::has_role`] inside an open transaction.
pub(crate) async fn has_role_in(
    conn: &mut PgConnection,
    user_id: UserId,
    role: Role,
) -> Result<bool, RepositoryError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM public.user_roles WHERE user_id = $1 AND role = $2)",
    )
    .bind(user_id)
    .bind(role.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists)
}

/// Whether any principal holds `role`, inside an open transaction.
pub(crate) async fn any_with_role_in(
    conn: &mut PgConnection,
    role: Role,
) -> Result<bool, RepositoryError> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM public.user_roles WHERE role = $1)",
    )
    .bind(role.as_str())
    .fetch_one(&mut *conn)
    .await?;

    Ok(exists)
}

/// Insert a grant inside an open transaction.
///
/// Returns `false` when the grant already existed.
pub(crate) async fn insert_grant(
    conn: &mut PgConnection,
    grant: &RoleGrant,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        INSERT INTO public.user_roles (user_id, role)
        VALUES ($1, $2)
        ON CONFLICT (user_id, role) DO NOTHING
        ",
    )
    .bind(grant.user_id)
    .bind(grant.role.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
