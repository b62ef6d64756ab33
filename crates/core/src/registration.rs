//! Registration and password-change form validation.

use core::fmt;

use crate::types::{Email, EmailError};

/// Minimum password length accepted by the hosted auth service.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Validation failures for the registration and password forms.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

/// A validated registration form.
#[derive(Clone, PartialEq, Eq)]
pub struct Registration {
    pub full_name: String,
    pub email: Email,
    pub password: String,
}

impl Registration {
    /// Validate raw form input.
    ///
    /// All fields are required after trimming. The name is stored trimmed; the
    /// password is kept as typed.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule, checked in form order.
    pub fn parse(
        full_name: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<Self, RegistrationError> {
        let full_name = full_name.trim();
        if full_name.is_empty()
            || email.trim().is_empty()
            || password.trim().is_empty()
            || confirm_password.trim().is_empty()
        {
            return Err(RegistrationError::MissingFields);
        }
        let email = Email::parse(email)?;
        check_password(password, confirm_password)?;

        Ok(Self {
            full_name: full_name.to_owned(),
            email,
            password: password.to_owned(),
        })
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("full_name", &self.full_name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A validated new password.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub new_password: String,
}

impl PasswordChange {
    /// # Errors
    ///
    /// Same password rules as registration.
    pub fn parse(new_password: &str, confirm_password: &str) -> Result<Self, RegistrationError> {
        if new_password.trim().is_empty() || confirm_password.trim().is_empty() {
            return Err(RegistrationError::MissingFields);
        }
        check_password(new_password, confirm_password)?;
        Ok(Self {
            new_password: new_password.to_owned(),
        })
    }
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChange")
            .field("new_password", &"[REDACTED]")
            .finish()
    }
}

fn check_password(password: &str, confirm: &str) -> Result<(), RegistrationError> {
    if password != confirm {
        return Err(RegistrationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(RegistrationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}
