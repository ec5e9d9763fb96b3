//! Supabase client: auth, `PostgREST` tables and object storage.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against the project's REST surface
//! - The backend is the source of truth; nothing is cached or synced locally
//! - Every request carries the anon key as `apikey` plus a bearer token (the
//!   signed-in user's access token when there is one, the anon key otherwise)
//!   so row-level security sees the right caller
//!
//! # Endpoints
//!
//! | Area    | Path                                     |
//! |---------|------------------------------------------|
//! | Auth    | `/auth/v1/signup`, `/auth/v1/token`, `/auth/v1/logout` |
//! | Tables  | `/rest/v1/profiles`, `/rest/v1/products` |
//! | Storage | `/storage/v1/object/{bucket}/{path}`     |
//!
//! # Example
//!
//! ```rust,ignore
//! let client = SupabaseClient::new(&config.supabase)?;
//! let products = client.list_products(None).await?;
//! ```

mod auth;
mod client;
mod storage;
mod tables;
pub mod types;

pub use client::SupabaseClient;
pub use storage::product_image_path;
pub use types::*;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum SupabaseError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with an error status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Best human-readable message found in the error body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Row or object not found (or hidden by row-level security).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl SupabaseError {
    /// HTTP status returned by the backend, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// Whether the backend rejected the caller's token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Error body shapes returned by the auth, `PostgREST` and storage services.
///
/// The three services disagree on field names, so every known field is
/// optional and [`ApiErrorBody::describe`] picks the most specific one.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<serde_json::Value>,
    details: Option<String>,
    hint: Option<String>,
}

impl ApiErrorBody {
    /// Parse an error body, falling back to the raw text.
    pub(crate) fn from_text(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_else(|_| Self {
            message: Some(text.chars().take(200).collect()),
            ..Self::default()
        })
    }

    /// The best message available, with `details`/`hint` appended.
    pub(crate) fn describe(&self) -> String {
        let error_text = self.error.as_ref().and_then(|value| match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });

        let primary = [
            self.msg.clone(),
            self.error_description.clone(),
            self.message.clone(),
            error_text,
        ]
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty());

        let mut parts: Vec<String> = primary.into_iter().collect();
        if let Some(details) = self.details.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("details: {details}"));
        }
        if let Some(hint) = self.hint.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("hint: {hint}"));
        }

        if parts.is_empty() {
            "(no error details provided)".to_string()
        } else {
            parts.join("; ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_auth_error() {
        let body = ApiErrorBody::from_text(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        );
        assert_eq!(body.describe(), "Invalid login credentials");
    }

    #[test]
    fn test_describe_signup_error() {
        let body = ApiErrorBody::from_text(r#"{"code":422,"msg":"User already registered"}"#);
        assert_eq!(body.describe(), "User already registered");
    }

    #[test]
    fn test_describe_postgrest_error_with_details() {
        let body = ApiErrorBody::from_text(
            r#"{"code":"42501","message":"new row violates row-level security policy","details":null,"hint":"check seller_id"}"#,
        );
        assert_eq!(
            body.describe(),
            "new row violates row-level security policy; hint: check seller_id"
        );
    }

    #[test]
    fn test_describe_storage_error() {
        let body = ApiErrorBody::from_text(
            r#"{"statusCode":"404","error":"Bucket not found","message":""}"#,
        );
        assert_eq!(body.describe(), "Bucket not found");
    }

    #[test]
    fn test_describe_non_json_body() {
        let body = ApiErrorBody::from_text("upstream connect error");
        assert_eq!(body.describe(), "upstream connect error");
    }

    #[test]
    fn test_describe_empty_body() {
        assert_eq!(
            ApiErrorBody::from_text("{}").describe(),
            "(no error details provided)"
        );
    }

    #[test]
    fn test_error_status_helpers() {
        let err = SupabaseError::Api {
            status: 401,
            message: "JWT expired".to_string(),
        };
        assert!(err.is_unauthorized());
        assert_eq!(err.to_string(), "API error (401): JWT expired");

        assert_eq!(SupabaseError::RateLimited(3).status(), Some(429));
        assert!(!SupabaseError::NotFound("product".to_string()).is_unauthorized());
    }
}
