//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AdminConfig;
use crate::services::auth::AuthError;
use crate::services::{GoTrueClient, PendingCount, PgApprovalStore, PgRoleLookup};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AdminConfig,
    pool: PgPool,
    auth: GoTrueClient,
    roles: PgRoleLookup,
    approvals: PgApprovalStore,
    pending: PendingCount,
}

impl AppState {
    /// Build state around an open pool and a running pending-count feed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the auth API client cannot be built.
    pub fn new(config: AdminConfig, pool: PgPool, pending: PendingCount) -> Result<Self, AuthError> {
        let auth = GoTrueClient::new(&config.auth)?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                roles: PgRoleLookup::new(pool.clone()),
                approvals: PgApprovalStore::new(pool.clone()),
                config,
                pool,
                auth,
                pending,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AdminConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Hosted auth service client.
    #[must_use]
    pub fn auth(&self) -> &GoTrueClient {
        &self.inner.auth
    }

    #[must_use]
    pub fn roles(&self) -> &PgRoleLookup {
        &self.inner.roles
    }

    #[must_use]
    pub fn approvals(&self) -> &PgApprovalStore {
        &self.inner.approvals
    }

    /// Live pending-request count.
    #[must_use]
    pub fn pending(&self) -> &PendingCount {
        &self.inner.pending
    }
}
