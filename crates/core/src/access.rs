//! Admin status and the access guard decision.
//!
//! A session's admin status is tri-state. `Unresolved` means the role grant
//! has not been looked up yet (or is being looked up); it is never treated as
//! "not an admin" until the guard turns it into [`AccessDecision::Suspend`].

use serde::{Deserialize, Serialize};

use crate::types::Principal;

/// Whether the signed-in principal holds the admin role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdminStatus {
    /// Role lookup has not completed.
    #[default]
    Unresolved,
    /// A role grant `{user_id, admin}` exists.
    Admin,
    /// No grant exists, or the lookup failed.
    NotAdmin,
}

impl AdminStatus {
    /// Map a role lookup result onto a status.
    ///
    /// Lookup errors fail closed.
    #[must_use]
    pub fn from_lookup<E>(result: &Result<bool, E>) -> Self {
        match result {
            Ok(true) => Self::Admin,
            Ok(false) | Err(_) => Self::NotAdmin,
        }
    }

    #[must_use]
    pub const fn is_resolved(self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

/// What the access guard does with a request for a protected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// Render the protected content.
    Allow,
    /// Admin status is still being resolved: render a neutral placeholder,
    /// neither the content nor a redirect.
    Suspend,
    /// Send the visitor to the sign-in entry point.
    Redirect {
        /// Set when a principal is signed in but is not an admin.
        not_admin: bool,
    },
}

impl AccessDecision {
    /// Decide access for the `admin` role.
    ///
    /// Only `{principal present, Admin}` is allowed. A missing principal always
    /// redirects, whatever the stored status says.
    #[must_use]
    pub const fn for_session(principal: Option<&Principal>, admin: AdminStatus) -> Self {
        match (principal, admin) {
            (None, _) => Self::Redirect { not_admin: false },
            (Some(_), AdminStatus::Admin) => Self::Allow,
            (Some(_), AdminStatus::Unresolved) => Self::Suspend,
            (Some(_), AdminStatus::NotAdmin) => Self::Redirect { not_admin: true },
        }
    }

    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{Email, UserId};

    fn principal() -> Principal {
        Principal {
            id: UserId::generate(),
            email: Email::parse("a@x.com").unwrap(),
            email_verified: true,
            full_name: Some("Ann".to_owned()),
            last_sign_in_at: None,
            created_at: None,
        }
    }

    #[test]
    fn test_admin_principal_is_allowed() {
        let p = principal();
        assert_eq!(
            AccessDecision::for_session(Some(&p), AdminStatus::Admin),
            AccessDecision::Allow
        );
    }

    #[test]
    fn test_unresolved_suspends_instead_of_redirecting() {
        let p = principal();
        let decision = AccessDecision::for_session(Some(&p), AdminStatus::Unresolved);
        assert_eq!(decision, AccessDecision::Suspend);
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_not_admin_redirects_with_notice() {
        let p = principal();
        assert_eq!(
            AccessDecision::for_session(Some(&p), AdminStatus::NotAdmin),
            AccessDecision::Redirect { not_admin: true }
        );
    }

    #[test]
    fn test_anonymous_always_redirects() {
        for status in [
            AdminStatus::Unresolved,
            AdminStatus::Admin,
            AdminStatus::NotAdmin,
        ] {
            assert_eq!(
                AccessDecision::for_session(None, status),
                AccessDecision::Redirect { not_admin: false }
            );
        }
    }

    #[test]
    fn test_lookup_errors_fail_closed() {
        let failed: Result<bool, &str> = Err("connection reset");
        assert_eq!(AdminStatus::from_lookup(&failed), AdminStatus::NotAdmin);
        assert_eq!(AdminStatus::from_lookup::<()>(&Ok(true)), AdminStatus::Admin);
        assert_eq!(AdminStatus::from_lookup::<()>(&Ok(false)), AdminStatus::NotAdmin);
    }

    #[test]
    fn test_default_is_unresolved() {
        assert_eq!(AdminStatus::default(), AdminStatus::Unresolved);
        assert!(!AdminStatus::Unresolved.is_resolved());
    }
}
