//! Authentication service.
//!
//! Password sign-up, sign-in and sign-out against the backend auth service.
//! Every state change is recorded through
//! [`apply_event`](crate::services::session_context::apply_event).

mod error;

pub use error::AuthError;

use marketplace_core::{Email, Password, Role};
use tower_sessions::Session;

use crate::services::session_context::{
    SessionContext, SessionEvent, apply_event, stored_session,
};
use crate::supabase::{ProfileUpdate, SignUpResponse, SupabaseClient, SupabaseError};

/// Sign-up form input.
#[derive(Debug, Clone)]
pub struct SignUpInput<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
    pub full_name: &'a str,
    pub role: Role,
}

/// Outcome of a successful sign-up.
#[derive(Debug)]
pub enum SignUpOutcome {
    /// The backend issued a session; the visitor is now signed in.
    SignedIn(SessionContext),
    /// The account exists but must be confirmed by email first.
    ConfirmationRequired,
}

/// Authentication service.
pub struct AuthService<'a> {
    client: &'a SupabaseClient,
    session: &'a Session,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service for one visitor's session.
    #[must_use]
    pub const fn new(client: &'a SupabaseClient, session: &'a Session) -> Self {
        Self { client, session }
    }

    /// Register a new account, then stamp name and role onto its profile.
    ///
    /// Password checks run before anything is sent to the backend. The
    /// profile update is a second request; when it fails the account keeps
    /// the backend's default profile and the failure is only logged.
    ///
    /// # Errors
    ///
    /// Returns validation errors, [`AuthError::UserAlreadyExists`], or the
    /// backend error.
    pub async fn sign_up(&self, input: &SignUpInput<'_>) -> Result<SignUpOutcome, AuthError> {
        let password = Password::confirm(input.password, input.confirm_password)?;
        let email = Email::parse(input.email)?;
        let full_name = input.full_name.trim();
        if full_name.is_empty() {
            return Err(AuthError::MissingName);
        }

        let response = self
            .client
            .sign_up(email.as_str(), password.expose(), full_name, input.role)
            .await
            .map_err(|e| match e {
                SupabaseError::Api { ref message, .. } if is_duplicate_user(message) => {
                    AuthError::UserAlreadyExists
                }
                other => AuthError::Backend(other),
            })?;

        let user_id = response.user().id;
        let token = match &response {
            SignUpResponse::Session(auth) => Some(auth.access_token.as_str()),
            SignUpResponse::User(_) => None,
        };
        let update = ProfileUpdate {
            full_name: full_name.to_string(),
            role: input.role,
        };
        if let Err(e) = self.client.update_profile(user_id, &update, token).await {
            tracing::warn!(
                error = %e,
                user_id = %user_id,
                "Failed to set profile after sign-up"
            );
        }

        match response {
            SignUpResponse::Session(auth) => {
                let ctx = apply_event(self.session, self.client, SessionEvent::SignedIn(auth))
                    .await?;
                Ok(SignUpOutcome::SignedIn(ctx))
            }
            SignUpResponse::User(_) => {
                tracing::info!(user_id = %user_id, "Account created, awaiting confirmation");
                Ok(SignUpOutcome::ConfirmationRequired)
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the backend rejects the
    /// pair, or the underlying backend/session error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SessionContext, AuthError> {
        let email = Email::parse(email)?;

        let auth = self
            .client
            .sign_in_with_password(email.as_str(), password)
            .await
            .map_err(|e| match e {
                SupabaseError::Api { status: 400, .. } => AuthError::InvalidCredentials,
                other => AuthError::Backend(other),
            })?;

        Ok(apply_event(self.session, self.client, SessionEvent::SignedIn(auth)).await?)
    }

    /// Sign out.
    ///
    /// Local state is cleared first; the backend revocation runs afterwards
    /// and its failure does not restore the session.
    ///
    /// # Errors
    ///
    /// Returns the backend error when revocation fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let previous = stored_session(self.session).await?;
        apply_event(self.session, self.client, SessionEvent::SignedOut).await?;

        if let Some(auth) = previous {
            self.client.sign_out(&auth.access_token).await?;
            tracing::info!(user_id = %auth.user.id, "User signed out");
        }
        Ok(())
    }
}

fn is_duplicate_user(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    ["already registered", "already been registered", "already exists"]
        .iter()
        .any(|needle| message.contains(needle))
}
