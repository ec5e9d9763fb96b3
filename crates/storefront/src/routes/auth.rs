//! Authentication route handlers.
//!
//! Login, sign-up and sign-out. Failed submissions re-render the form with
//! the visitor's input (never the password) and an error toast.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use marketplace_core::Role;
use serde::Deserialize;

use crate::filters;
use crate::middleware::{CurrentSession, flash_error, flash_success};
use crate::models::session::Flash;
use crate::routes::layout::Layout;
use crate::services::auth::{AuthError, AuthService, SignUpInput, SignUpOutcome};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign-up form data.
#[derive(Deserialize)]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub role: Role,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignUpTemplate {
    pub layout: Layout,
    pub full_name: String,
    pub email: String,
    pub is_seller: bool,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page. Signed-in visitors go home.
pub async fn login_page(current: CurrentSession) -> Response {
    if current.context.user.is_some() {
        return Redirect::to("/").into_response();
    }

    LoginTemplate {
        layout: Layout::build(&current).await,
        email: String::new(),
    }
    .into_response()
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    current: CurrentSession,
    Form(form): Form<LoginForm>,
) -> Response {
    let auth = AuthService::new(state.supabase(), &current.session);

    match auth.sign_in(&form.email, &form.password).await {
        Ok(_) => {
            flash_success(&current.session, "Logged in successfully!").await;
            Redirect::to("/").into_response()
        }
        Err(e) => {
            log_auth_failure("Login failed", &e);
            let layout = Layout::build(&current)
                .await
                .with_flash(Flash::error(e.user_message()));
            (
                failure_status(&e),
                LoginTemplate {
                    layout,
                    email: form.email,
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Sign-up Routes
// =============================================================================

/// Display the sign-up page. Signed-in visitors go home.
pub async fn signup_page(current: CurrentSession) -> Response {
    if current.context.user.is_some() {
        return Redirect::to("/").into_response();
    }

    SignUpTemplate {
        layout: Layout::build(&current).await,
        full_name: String::new(),
        email: String::new(),
        is_seller: false,
    }
    .into_response()
}

/// Handle sign-up form submission.
///
/// Password mismatch and length are checked before any backend call.
pub async fn signup(
    State(state): State<AppState>,
    current: CurrentSession,
    Form(form): Form<SignUpForm>,
) -> Response {
    let auth = AuthService::new(state.supabase(), &current.session);
    let input = SignUpInput {
        email: &form.email,
        password: &form.password,
        confirm_password: &form.confirm_password,
        full_name: &form.full_name,
        role: form.role,
    };

    match auth.sign_up(&input).await {
        Ok(SignUpOutcome::SignedIn(_)) => {
            flash_success(&current.session, "Account created successfully!").await;
            Redirect::to("/").into_response()
        }
        Ok(SignUpOutcome::ConfirmationRequired) => {
            flash_success(&current.session, "Account created successfully!").await;
            flash_success(
                &current.session,
                "Check your email to confirm your account, then log in.",
            )
            .await;
            Redirect::to("/login").into_response()
        }
        Err(e) => {
            log_auth_failure("Sign-up failed", &e);
            let layout = Layout::build(&current)
                .await
                .with_flash(Flash::error(e.user_message()));
            (
                failure_status(&e),
                SignUpTemplate {
                    layout,
                    is_seller: form.role.can_sell(),
                    full_name: form.full_name,
                    email: form.email,
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out and go home.
///
/// The local session is cleared even when the backend call fails.
pub async fn logout(State(state): State<AppState>, current: CurrentSession) -> Response {
    let auth = AuthService::new(state.supabase(), &current.session);

    match auth.sign_out().await {
        Ok(()) => flash_success(&current.session, "Signed out successfully!").await,
        Err(e) => {
            tracing::warn!(error = %e, "Sign-out failed");
            flash_error(&current.session, "Error signing out").await;
        }
    }

    Redirect::to("/").into_response()
}

fn failure_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::Backend(_) | AuthError::Session(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn log_auth_failure(message: &str, err: &AuthError) {
    if err.is_validation() {
        tracing::debug!(error = %err, "{message}");
    } else {
        tracing::warn!(error = %err, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketplace_core::PasswordError;

    #[test]
    fn test_signup_form_defaults_to_buyer() {
        let form: SignUpForm = serde_json::from_value(serde_json::json!({
            "full_name": "Ana",
            "email": "ana@example.com",
            "password": "secret1",
            "confirm_password": "secret1"
        }))
        .unwrap_or_else(|e| panic!("form should parse: {e}"));
        assert_eq!(form.role, Role::Buyer);
    }

    #[test]
    fn test_failure_status() {
        assert_eq!(
            failure_status(&AuthError::Password(PasswordError::Mismatch)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            failure_status(&AuthError::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
    }
}
