//! Authentication error types.

use marketplace_core::{EmailError, PasswordError};
use thiserror::Error;

use crate::supabase::SupabaseError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password rejected before reaching the backend.
    #[error("{0}")]
    Password(#[from] PasswordError),

    /// Full name left blank.
    #[error("full name is required")]
    MissingName,

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] SupabaseError),

    /// Session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// Message suitable for a toast.
    ///
    /// Validation and credential problems are shown as-is; backend
    /// rejections show the backend's own message; anything else is generic.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::Password(err) => err.to_string(),
            Self::MissingName => "Please enter your full name".to_string(),
            Self::InvalidCredentials => "Invalid login credentials".to_string(),
            Self::UserAlreadyExists => "User already registered".to_string(),
            Self::Backend(SupabaseError::Api { status, message }) if *status < 500 => {
                message.clone()
            }
            Self::Backend(SupabaseError::RateLimited(_)) => {
                "Too many attempts, please try again later".to_string()
            }
            Self::Backend(_) | Self::Session(_) => {
                "Something went wrong, please try again".to_string()
            }
        }
    }

    /// Whether the failure was caught before any backend call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidEmail(_) | Self::Password(_) | Self::MissingName
        )
    }
}
