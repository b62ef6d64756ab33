//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans with status and latency)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! The access guard is not a layer: gated handlers take the
//! [`RequireAdmin`] extractor.

pub mod auth;
pub mod session;

pub use auth::{GuardRejection, LOGIN_PATH, RequireAdmin};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
