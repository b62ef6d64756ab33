//! The authenticated account as reported by the hosted auth service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Email, UserId};

/// An account in the external identity system.
///
/// Created by the auth service's sign-up call and never mutated here; the
/// admin console only reads it back from sign-in and refresh responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub email: Email,
    /// Whether the address has been confirmed with the auth service.
    pub email_verified: bool,
    /// `full_name` from the sign-up metadata, if any.
    pub full_name: Option<String>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Principal {
    /// Name to show in the navigation bar.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.email.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn principal(full_name: Option<&str>) -> Principal {
        Principal {
            id: UserId::generate(),
            email: Email::parse("ann@x.com").unwrap(),
            email_verified: true,
            full_name: full_name.map(String::from),
            last_sign_in_at: None,
            created_at: None,
        }
    }

    #[test]
    fn test_display_name_prefers_full_name() {
        assert_eq!(principal(Some("Ann Lee")).display_name(), "Ann Lee");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        assert_eq!(principal(None).display_name(), "ann@x.com");
        assert_eq!(principal(Some("  ")).display_name(), "ann@x.com");
    }
}
