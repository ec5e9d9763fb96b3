//! Per-request view of who is signed in.
//!
//! The stored [`AuthSession`] lives in the visitor's server-side session.
//! [`bootstrap`] turns it into a [`SessionContext`] at the start of every
//! request, refreshing expired tokens and loading the profile row.
//! [`apply_event`] is the only code that writes the stored session.

use marketplace_core::Role;
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::session::keys;
use crate::supabase::{AuthSession, AuthUser, Profile, SupabaseClient};

/// A change to the visitor's authentication state.
#[derive(Debug)]
pub enum SessionEvent {
    /// A new session from sign-in or sign-up.
    SignedIn(AuthSession),
    /// The same user with fresh tokens.
    TokenRefreshed(AuthSession),
    /// The visitor signed out or the session could not be renewed.
    SignedOut,
}

/// Who is signed in and what their profile says.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    /// Backend identity, `None` when signed out.
    pub user: Option<AuthUser>,
    /// Profile row; `None` when signed out or when the fetch failed.
    pub profile: Option<Profile>,
    /// Set while the stored session could not be read.
    pub loading: bool,
    pub(crate) access_token: Option<String>,
}

impl SessionContext {
    /// A context whose session state is not known yet.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// A resolved, signed-out context.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    fn signed_in(auth: &AuthSession, profile: Option<Profile>) -> Self {
        Self {
            user: Some(auth.user.clone()),
            profile,
            loading: false,
            access_token: Some(auth.access_token.clone()),
        }
    }

    /// Bearer token for backend calls made on the user's behalf.
    #[must_use]
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Profile role, when the profile is known.
    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().map(|p| p.role)
    }

    #[must_use]
    pub fn is_seller(&self) -> bool {
        self.role().is_some_and(Role::can_sell)
    }

    /// Name used in the navbar greeting.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.profile.as_ref().map_or("User", Profile::display_name)
    }
}

/// Build the context for the current request.
///
/// Expired tokens are renewed with the refresh token; when renewal fails the
/// visitor is signed out locally. A failed profile fetch is logged and
/// leaves `profile` empty.
///
/// # Errors
///
/// Returns an error only when the session store itself fails.
pub async fn bootstrap(
    session: &Session,
    client: &SupabaseClient,
) -> Result<SessionContext, tower_sessions::session::Error> {
    let Some(stored) = session.get::<AuthSession>(keys::AUTH_SESSION).await? else {
        return Ok(SessionContext::signed_out());
    };

    if !stored.is_expired() {
        let profile = load_profile(client, &stored).await;
        return Ok(SessionContext::signed_in(&stored, profile));
    }

    match client.refresh_session(&stored.refresh_token).await {
        Ok(fresh) => apply_event(session, client, SessionEvent::TokenRefreshed(fresh)).await,
        Err(e) => {
            tracing::warn!(
                error = %e,
                user_id = %stored.user.id,
                "Session refresh failed, signing out"
            );
            apply_event(session, client, SessionEvent::SignedOut).await
        }
    }
}

/// Record a session change and return the resulting context.
///
/// # Errors
///
/// Returns an error if the session store cannot be written.
pub async fn apply_event(
    session: &Session,
    client: &SupabaseClient,
    event: SessionEvent,
) -> Result<SessionContext, tower_sessions::session::Error> {
    match event {
        SessionEvent::SignedIn(auth) => {
            // New identity, new session id
            session.cycle_id().await?;
            session.insert(keys::AUTH_SESSION, &auth).await?;
            set_sentry_user(&auth.user.id, auth.user.email.as_deref());
            tracing::info!(user_id = %auth.user.id, "User signed in");

            let profile = load_profile(client, &auth).await;
            Ok(SessionContext::signed_in(&auth, profile))
        }
        SessionEvent::TokenRefreshed(auth) => {
            session.insert(keys::AUTH_SESSION, &auth).await?;
            tracing::debug!(user_id = %auth.user.id, "Session tokens refreshed");

            let profile = load_profile(client, &auth).await;
            Ok(SessionContext::signed_in(&auth, profile))
        }
        SessionEvent::SignedOut => {
            session.remove::<AuthSession>(keys::AUTH_SESSION).await?;
            clear_sentry_user();
            Ok(SessionContext::signed_out())
        }
    }
}

/// The stored session without touching the backend.
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn stored_session(
    session: &Session,
) -> Result<Option<AuthSession>, tower_sessions::session::Error> {
    session.get::<AuthSession>(keys::AUTH_SESSION).await
}

async fn load_profile(client: &SupabaseClient, auth: &AuthSession) -> Option<Profile> {
    match client.fetch_profile(auth.user.id, &auth.access_token).await {
        Ok(profile) => Some(profile),
        Err(e) => {
            tracing::warn!(error = %e, user_id = %auth.user.id, "Failed to fetch profile");
            None
        }
    }
}
