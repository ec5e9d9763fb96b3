//! Session extractors and the seller route guard.
//!
//! [`CurrentSession`] bootstraps the visitor's [`SessionContext`] once per
//! request. [`RequireSeller`] runs the guard in front of the dashboard.
//!
//! The guard only shapes navigation. Whether a write is allowed is decided
//! by the backend's row-level rules.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header::RETRY_AFTER, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use marketplace_core::Role;
use tower_sessions::Session;

use crate::error::AppError;
use crate::filters;
use crate::middleware::flash::flash_error;
use crate::services::session_context::{SessionContext, bootstrap};
use crate::state::AppState;

/// Toast shown when a signed-in non-seller opens the dashboard.
pub const ACCESS_DENIED: &str = "Access denied. Sellers only.";

// =============================================================================
// Guard state machine
// =============================================================================

/// Where the visitor stands, as far as the guard is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessState {
    /// Session state not resolved yet.
    Loading,
    Unauthenticated,
    /// Signed in; the role is `None` when the profile could not be loaded.
    Authenticated(Option<Role>),
}

impl AccessState {
    #[must_use]
    pub fn of(context: &SessionContext) -> Self {
        if context.loading {
            Self::Loading
        } else if context.user.is_none() {
            Self::Unauthenticated
        } else {
            Self::Authenticated(context.role())
        }
    }
}

/// What a route demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    SignedIn,
    Seller,
}

/// Outcome of running the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the spinner and try again shortly.
    Wait,
    RedirectToLogin,
    RedirectHome,
    Allow,
}

/// Decide what to do with a request to a guarded route.
#[must_use]
pub const fn decide(state: AccessState, requirement: Requirement) -> GuardDecision {
    match (state, requirement) {
        (AccessState::Loading, _) => GuardDecision::Wait,
        (AccessState::Unauthenticated, _) => GuardDecision::RedirectToLogin,
        (AccessState::Authenticated(_), Requirement::SignedIn)
        | (AccessState::Authenticated(Some(Role::Seller)), Requirement::Seller) => {
            GuardDecision::Allow
        }
        (AccessState::Authenticated(_), Requirement::Seller) => GuardDecision::RedirectHome,
    }
}

// =============================================================================
// Extractors
// =============================================================================

/// The visitor's session plus the context bootstrapped from it.
///
/// When the session store cannot be read the context is left in the
/// loading state instead of failing the request.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(current: CurrentSession) -> impl IntoResponse {
///     format!("Hello, {}!", current.context.display_name())
/// }
/// ```
#[derive(Clone)]
pub struct CurrentSession {
    pub session: Session,
    pub context: SessionContext,
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, message)| AppError::Internal(message.to_string()))?;

        if let Some(context) = parts.extensions.get::<SessionContext>() {
            return Ok(Self {
                session,
                context: context.clone(),
            });
        }

        let context = match bootstrap(&session, state.supabase()).await {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(error = %e, "Session store unavailable");
                SessionContext::loading()
            }
        };

        if let Some(user) = &context.user {
            tracing::Span::current().record("user_id", tracing::field::display(user.id));
        }
        parts.extensions.insert(context.clone());

        Ok(Self { session, context })
    }
}

/// Extractor for seller-only routes.
///
/// Signed-out visitors go to `/login`; signed-in visitors without the
/// seller role go home with an "access denied" toast.
pub struct RequireSeller(pub CurrentSession);

/// Spinner page shown while the session is still resolving.
#[derive(Template, WebTemplate)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub return_to: String,
}

/// Response for a request the guard did not allow.
pub enum GuardRejection {
    Wait { return_to: String },
    RedirectToLogin,
    RedirectHome,
    Error(AppError),
}

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Wait { return_to } => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(RETRY_AFTER, "2")],
                LoadingTemplate { return_to },
            )
                .into_response(),
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::RedirectHome => Redirect::to("/").into_response(),
            Self::Error(err) => err.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireSeller {
    type Rejection = GuardRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let current = CurrentSession::from_request_parts(parts, state)
            .await
            .map_err(GuardRejection::Error)?;

        match decide(AccessState::of(&current.context), Requirement::Seller) {
            GuardDecision::Allow => Ok(Self(current)),
            GuardDecision::Wait => Err(GuardRejection::Wait {
                return_to: parts.uri.path().to_string(),
            }),
            GuardDecision::RedirectToLogin => Err(GuardRejection::RedirectToLogin),
            GuardDecision::RedirectHome => {
                flash_error(&current.session, ACCESS_DENIED).await;
                Err(GuardRejection::RedirectHome)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::supabase::{AuthUser, Profile};

    fn signed_in(role: Option<Role>) -> SessionContext {
        let id = "2b0f3c4e-8d1a-4f7e-9a53-0c6d2e1b7a90".parse().unwrap();
        SessionContext {
            user: Some(AuthUser {
                id,
                email: Some("someone@example.com".to_string()),
            }),
            profile: role.map(|role| Profile {
                id,
                full_name: Some("Someone".to_string()),
                role,
            }),
            loading: false,
            access_token: Some("user-jwt".to_string()),
        }
    }

    #[test]
    fn test_access_state_of_context() {
        assert_eq!(
            AccessState::of(&SessionContext::loading()),
            AccessState::Loading
        );
        assert_eq!(
            AccessState::of(&SessionContext::signed_out()),
            AccessState::Unauthenticated
        );
        assert_eq!(
            AccessState::of(&signed_in(Some(Role::Seller))),
            AccessState::Authenticated(Some(Role::Seller))
        );
        assert_eq!(
            AccessState::of(&signed_in(None)),
            AccessState::Authenticated(None)
        );
    }

    #[test]
    fn test_signed_in_context_exposes_token() {
        let ctx = signed_in(Some(Role::Buyer));
        assert_eq!(ctx.access_token(), Some("user-jwt"));
        assert!(!ctx.is_seller());
    }

    #[test]
    fn test_loading_always_waits() {
        for requirement in [Requirement::SignedIn, Requirement::Seller] {
            assert_eq!(
                decide(AccessState::Loading, requirement),
                GuardDecision::Wait
            );
        }
    }

    #[test]
    fn test_signed_out_goes_to_login() {
        for requirement in [Requirement::SignedIn, Requirement::Seller] {
            assert_eq!(
                decide(AccessState::Unauthenticated, requirement),
                GuardDecision::RedirectToLogin
            );
        }
    }

    #[test]
    fn test_seller_routes() {
        let seller = AccessState::Authenticated(Some(Role::Seller));
        let buyer = AccessState::Authenticated(Some(Role::Buyer));
        let unknown = AccessState::Authenticated(None);

        assert_eq!(decide(seller, Requirement::Seller), GuardDecision::Allow);
        assert_eq!(decide(buyer, Requirement::Seller), GuardDecision::RedirectHome);
        assert_eq!(decide(unknown, Requirement::Seller), GuardDecision::RedirectHome);
    }

    #[test]
    fn test_signed_in_routes_ignore_role() {
        for role in [None, Some(Role::Buyer), Some(Role::Seller)] {
            assert_eq!(
                decide(AccessState::Authenticated(role), Requirement::SignedIn),
                GuardDecision::Allow
            );
        }
    }

    #[test]
    fn test_wait_renders_spinner() {
        let response = GuardRejection::Wait {
            return_to: "/dashboard".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[RETRY_AFTER], "2");
    }

    #[test]
    fn test_redirects() {
        let response = GuardRejection::RedirectToLogin.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/login");
    }
}
