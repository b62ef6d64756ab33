//! Dazzle Core - Domain types for the admin console.
//!
//! This crate provides the types and pure logic shared by the Dazzle components:
//! - `admin` - The administration server (sessions, approvals, catalog views)
//! - `cli` - Command-line tools for migrations and operator tasks
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything that decides *whether* something may
//! happen (access decisions, approval transitions, form validation, list
//! filtering) lives here so it can be tested without a backend.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, statuses and the authenticated principal
//! - [`access`] - Tri-state admin status and the access guard decision
//! - [`approval`] - The admin request state machine
//! - [`filter`] - Text and status filtering over admin requests
//! - [`registration`] - Registration and password form validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod approval;
pub mod filter;
pub mod registration;
pub mod types;

pub use access::{AccessDecision, AdminStatus};
pub use approval::{AdminRequest, NewAdminRequest, RoleGrant, TransitionError, normalize_reason};
pub use filter::{RequestFilter, StatusFilter};
pub use registration::{PasswordChange, Registration, RegistrationError};
pub use types::*;
