//! In-memory fakes for the service seams.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Duration, Utc};
use tower_sessions::Session;
use url::Url;

use dazzle_core::{
    AdminRequest, AdminRequestId, Email, NewAdminRequest, Principal, RequestStatus, RoleGrant,
    TransitionError, UserId,
};

use crate::db::{BootstrapOutcome, RepositoryError, ReviewOutcome};
use crate::models::{AuthSession, session_keys};
use crate::services::approvals::ApprovalStore;
use crate::services::auth::{AuthError, AuthGrant, AuthProvider, AuthTokens, SignUp};
use crate::services::session::RoleLookup;

fn store_down() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

fn tokens_for(email: &Email) -> AuthTokens {
    AuthTokens {
        access_token: format!("access:{email}"),
        refresh_token: format!("refresh:{email}"),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

fn principal(email: Email, full_name: Option<&str>) -> Principal {
    Principal {
        id: UserId::generate(),
        email,
        email_verified: true,
        full_name: full_name.map(ToOwned::to_owned),
        last_sign_in_at: None,
        created_at: Some(Utc::now()),
    }
}

/// A signed-in grant for a fresh principal.
pub fn grant_for(email: &str) -> AuthGrant {
    let email = Email::parse(email).unwrap_or_else(|e| panic!("bad test email: {e}"));
    AuthGrant {
        tokens: tokens_for(&email),
        principal: principal(email, None),
    }
}

// =============================================================================
// Roles
// =============================================================================

/// [`RoleLookup`] over a fixed admin set.
pub struct FakeRoles {
    admins: Mutex<HashSet<UserId>>,
    failing: bool,
    hanging: bool,
    observe: Option<Session>,
    observed: Mutex<Option<AuthSession>>,
}

impl FakeRoles {
    pub fn admins(ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            admins: Mutex::new(ids.into_iter().collect()),
            failing: false,
            hanging: false,
            observe: None,
            observed: Mutex::new(None),
        }
    }

    /// Every lookup fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::admins([])
        }
    }

    /// Every lookup waits forever.
    pub fn hanging() -> Self {
        Self {
            hanging: true,
            ..Self::admins([])
        }
    }

    /// Record what `session` holds at the moment of each lookup.
    pub fn observing(self, session: Session) -> Self {
        Self {
            observe: Some(session),
            ..self
        }
    }

    pub fn observed(&self) -> Option<AuthSession> {
        lock(&self.observed).clone()
    }

    pub fn revoke(&self, id: UserId) {
        lock(&self.admins).remove(&id);
    }
}

impl RoleLookup for FakeRoles {
    async fn is_admin(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        if let Some(session) = &self.observe {
            let seen = session
                .get::<AuthSession>(session_keys::AUTH)
                .await
                .ok()
                .flatten();
            *lock(&self.observed) = seen;
        }
        if self.hanging {
            std::future::pending::<()>().await;
        }
        if self.failing {
            return Err(store_down());
        }
        Ok(lock(&self.admins).contains(&user_id))
    }
}

// =============================================================================
// Auth
// =============================================================================

struct Account {
    principal: Principal,
    password: String,
}

/// [`AuthProvider`] keeping accounts in memory.
#[derive(Default)]
pub struct FakeAuth {
    accounts: Mutex<HashMap<Email, Account>>,
    immediate_sessions: bool,
    sign_outs: AtomicUsize,
}

impl FakeAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign-up returns tokens, as with email confirmation disabled.
    pub fn with_immediate_sessions(self) -> Self {
        Self {
            immediate_sessions: true,
            ..self
        }
    }

    pub fn sign_outs(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    pub fn principal_count(&self) -> usize {
        lock(&self.accounts).len()
    }

    fn email_from_token(token: &str, prefix: &str) -> Option<Email> {
        token
            .strip_prefix(prefix)
            .and_then(|email| Email::parse(email).ok())
    }

    fn grant(&self, email: &Email) -> Result<AuthGrant, AuthError> {
        let accounts = lock(&self.accounts);
        let account = accounts.get(email).ok_or(AuthError::SessionExpired)?;
        Ok(AuthGrant {
            principal: account.principal.clone(),
            tokens: tokens_for(email),
        })
    }
}

impl AuthProvider for FakeAuth {
    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
        full_name: &str,
        _redirect_to: &Url,
    ) -> Result<SignUp, AuthError> {
        let mut accounts = lock(&self.accounts);
        if accounts.contains_key(email) {
            return Err(AuthError::UserAlreadyRegistered);
        }
        let principal = principal(email.clone(), Some(full_name));
        accounts.insert(
            email.clone(),
            Account {
                principal: principal.clone(),
                password: password.to_owned(),
            },
        );
        let tokens = self.immediate_sessions.then(|| tokens_for(email));
        Ok(SignUp { principal, tokens })
    }

    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthGrant, AuthError> {
        let matches = lock(&self.accounts)
            .get(email)
            .is_some_and(|account| account.password == password);
        if !matches {
            return Err(AuthError::InvalidCredentials);
        }
        self.grant(email)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthGrant, AuthError> {
        let email =
            Self::email_from_token(refresh_token, "refresh:").ok_or(AuthError::SessionExpired)?;
        self.grant(&email)
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_password(&self, access_token: &str, new_password: &str) -> Result<(), AuthError> {
        let email =
            Self::email_from_token(access_token, "access:").ok_or(AuthError::SessionExpired)?;
        let mut accounts = lock(&self.accounts);
        let account = accounts.get_mut(&email).ok_or(AuthError::SessionExpired)?;
        new_password.clone_into(&mut account.password);
        Ok(())
    }
}

// =============================================================================
// Approvals
// =============================================================================

#[derive(Default)]
struct Approvals {
    requests: Vec<AdminRequest>,
    grants: HashSet<RoleGrant>,
    fail_writes: bool,
}

impl Approvals {
    fn is_admin(&self, user_id: UserId) -> bool {
        self.grants.contains(&RoleGrant::admin(user_id))
    }

    fn position(&self, id: AdminRequestId) -> Option<usize> {
        self.requests.iter().position(|r| r.id == id)
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes { Err(store_down()) } else { Ok(()) }
    }
}

/// [`ApprovalStore`] in memory. Each call is atomic under one lock.
#[derive(Default)]
pub struct MemoryApprovalStore {
    inner: Mutex<Approvals>,
}

impl MemoryApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant admin to a fresh principal and return its ID.
    pub fn seed_admin(&self) -> UserId {
        let id = UserId::generate();
        lock(&self.inner).grants.insert(RoleGrant::admin(id));
        id
    }

    pub fn seed_pending(&self, full_name: &str, email: &str) -> AdminRequest {
        let email = Email::parse(email).unwrap_or_else(|e| panic!("bad test email: {e}"));
        let request = pending(
            &NewAdminRequest {
                user_id: UserId::generate(),
                full_name: full_name.to_owned(),
                email,
            },
            Utc::now(),
        );
        lock(&self.inner).requests.push(request.clone());
        request
    }

    /// Make every write fail without changing state.
    pub fn fail_writes(&self, fail: bool) {
        lock(&self.inner).fail_writes = fail;
    }

    pub fn grants(&self) -> HashSet<RoleGrant> {
        lock(&self.inner).grants.clone()
    }

    pub fn has_grant(&self, user_id: UserId) -> bool {
        lock(&self.inner).is_admin(user_id)
    }
}

fn pending(new: &NewAdminRequest, at: DateTime<Utc>) -> AdminRequest {
    AdminRequest {
        id: AdminRequestId::generate(),
        user_id: new.user_id,
        full_name: new.full_name.clone(),
        email: new.email.clone(),
        status: RequestStatus::Pending,
        reviewed_by: None,
        reviewed_at: None,
        rejection_reason: None,
        created_at: at,
    }
}

impl ApprovalStore for MemoryApprovalStore {
    async fn list(&self) -> Result<Vec<AdminRequest>, RepositoryError> {
        Ok(lock(&self.inner).requests.iter().rev().cloned().collect())
    }

    async fn list_by_status(
        &self,
        status: RequestStatus,
    ) -> Result<Vec<AdminRequest>, RepositoryError> {
        Ok(lock(&self.inner)
            .requests
            .iter()
            .rev()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }

    async fn get(&self, id: AdminRequestId) -> Result<Option<AdminRequest>, RepositoryError> {
        let inner = lock(&self.inner);
        Ok(inner.position(id).map(|i| inner.requests[i].clone()))
    }

    async fn create(&self, new: &NewAdminRequest) -> Result<AdminRequest, RepositoryError> {
        let mut inner = lock(&self.inner);
        inner.check_writable()?;
        let request = pending(new, Utc::now());
        inner.requests.push(request.clone());
        Ok(request)
    }

    async fn approve(
        &self,
        id: AdminRequestId,
        reviewer: UserId,
        at: DateTime<Utc>,
    ) -> Result<ReviewOutcome, RepositoryError> {
        let mut inner = lock(&self.inner);
        let Some(index) = inner.position(id) else {
            return Ok(ReviewOutcome::NotFound);
        };
        if !inner.is_admin(reviewer) {
            return Ok(ReviewOutcome::ReviewerNotAdmin);
        }
        let (approved, grant) = match inner.requests[index].clone().approve(reviewer, at) {
            Ok(reviewed) => reviewed,
            Err(TransitionError::AlreadyReviewed { status }) => {
                return Ok(ReviewOutcome::AlreadyReviewed(status));
            }
        };
        inner.check_writable()?;
        inner.grants.insert(grant);
        inner.requests[index] = approved.clone();
        Ok(ReviewOutcome::Reviewed(approved))
    }

    async fn reject(
        &self,
        id: AdminRequestId,
        reviewer: UserId,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<ReviewOutcome, RepositoryError> {
        let mut inner = lock(&self.inner);
        let Some(index) = inner.position(id) else {
            return Ok(ReviewOutcome::NotFound);
        };
        let rejected = match inner.requests[index].clone().reject(reviewer, reason, at) {
            Ok(rejected) => rejected,
            Err(TransitionError::AlreadyReviewed { status }) => {
                return Ok(ReviewOutcome::AlreadyReviewed(status));
            }
        };
        inner.check_writable()?;
        inner.requests[index] = rejected.clone();
        Ok(ReviewOutcome::Reviewed(rejected))
    }

    async fn count_pending(&self) -> Result<i64, RepositoryError> {
        let count = lock(&self.inner)
            .requests
            .iter()
            .filter(|r| r.is_pending())
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn bootstrap_first_admin(
        &self,
        email: &Email,
        at: DateTime<Utc>,
    ) -> Result<BootstrapOutcome, RepositoryError> {
        let mut inner = lock(&self.inner);
        inner.check_writable()?;
        if !inner.grants.is_empty() {
            return Ok(BootstrapOutcome::AdminAlreadyExists);
        }
        let Some(index) = inner
            .requests
            .iter()
            .rposition(|r| r.is_pending() && &r.email == email)
        else {
            return Ok(BootstrapOutcome::NoPendingRequest);
        };
        let Ok((approved, grant)) = inner.requests[index].clone().approve_as_bootstrap(at) else {
            return Ok(BootstrapOutcome::NoPendingRequest);
        };
        inner.grants.insert(grant);
        inner.requests[index] = approved.clone();
        Ok(BootstrapOutcome::Approved(approved))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Application state over a lazy pool that never connects.
///
/// Only suitable for requests that stop before touching the database.
pub fn app_state() -> crate::state::AppState {
    use secrecy::SecretString;

    let config = crate::config::AdminConfig {
        database_url: SecretString::from("postgres://localhost/dazzle_test"),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 3001,
        base_url: Url::parse("http://localhost:3001").unwrap_or_else(|e| panic!("{e}")),
        auth: crate::config::AuthApiConfig {
            url: Url::parse("http://localhost:9999").unwrap_or_else(|e| panic!("{e}")),
            api_key: SecretString::from("test-api-key"),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    };
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/dazzle_test")
        .unwrap_or_else(|e| panic!("{e}"));
    let (_tx, pending) = crate::services::PendingCount::fixed(Some(2));

    crate::state::AppState::new(config, pool, pending).unwrap_or_else(|e| panic!("{e}"))
}
