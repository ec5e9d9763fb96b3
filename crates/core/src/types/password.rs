//! Sign-up password policy.

use core::fmt;

/// Why a sign-up password was rejected.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordError {
    /// Password and confirmation differ.
    #[error("Passwords do not match")]
    Mismatch,
    /// Shorter than [`Password::MIN_LENGTH`] characters.
    #[error("Password must be at least {min} characters")]
    TooShort {
        /// Minimum accepted length.
        min: usize,
    },
}

/// A password that passed the sign-up checks.
///
/// The value never appears in `Debug` output.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    /// Minimum length accepted by the backend's default auth settings.
    pub const MIN_LENGTH: usize = 6;

    /// Check a password and its confirmation.
    ///
    /// The mismatch check runs first so a typo in the confirmation field is
    /// reported as such even when the password is also too short.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError::Mismatch`] or [`PasswordError::TooShort`].
    pub fn confirm(password: &str, confirmation: &str) -> Result<Self, PasswordError> {
        if password != confirmation {
            return Err(PasswordError::Mismatch);
        }
        if password.chars().count() < Self::MIN_LENGTH {
            return Err(PasswordError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }
        Ok(Self(password.to_owned()))
    }

    /// Expose the raw password for the outgoing sign-up request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}
