//! Business logic services for admin.
//!
//! # Services
//!
//! - `approvals` - Approve/reject workflow over admin requests
//! - `auth` - Hosted auth service client (sign-up, sign-in, refresh)
//! - `pending_count` - Live pending-request count fed by database notifications
//! - `registration` - Sign-up plus pending request submission
//! - `session` - Session store owning each browser session's auth state

pub mod approvals;
pub mod auth;
pub mod pending_count;
pub mod registration;
pub mod session;

pub use approvals::{ApprovalError, ApprovalService, ApprovalStore, PgApprovalStore};
pub use auth::{AuthError, AuthGrant, AuthProvider, AuthTokens, GoTrueClient};
pub use pending_count::PendingCount;
pub use registration::{RegistrationError, RegistrationService};
pub use session::{PgRoleLookup, RoleLookup, SessionError, SessionStore};
