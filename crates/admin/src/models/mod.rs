//! Session-held models for admin.

pub mod session;

pub use session::{AuthEvent, AuthSession, keys as session_keys};
