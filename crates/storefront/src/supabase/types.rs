//! Wire types for the backend's auth and table endpoints.

use chrono::{DateTime, Utc};
use marketplace_core::{ProductId, Role, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Seconds before the real expiry at which a token is treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 60;

// =============================================================================
// Auth
// =============================================================================

/// The authenticated identity attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens issued by the auth service.
///
/// `Debug` is implemented manually so tokens never reach the logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Unix timestamp (seconds) at which `access_token` stops being valid.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl AuthSession {
    /// Fill in `expires_at` from `expires_in` when the service omitted it.
    #[must_use]
    pub fn stamp_expiry(mut self, now: DateTime<Utc>) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = self.expires_in.map(|secs| now.timestamp() + secs);
        }
        self
    }

    /// Whether the access token is expired (or about to be) at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|at| now.timestamp() + EXPIRY_SKEW_SECS >= at)
    }

    /// Whether the access token is expired (or about to be) right now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Response to a sign-up request.
///
/// With email confirmation disabled the service signs the user in and
/// returns a session; otherwise it returns only the new user.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(AuthSession),
    User(AuthUser),
}

impl SignUpResponse {
    /// The created user.
    #[must_use]
    pub const fn user(&self) -> &AuthUser {
        match self {
            Self::Session(session) => &session.user,
            Self::User(user) => user,
        }
    }
}

/// Sign-up request body.
#[derive(Debug, Serialize)]
pub(crate) struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: SignUpMetadata<'a>,
}

/// User metadata stored alongside the auth record.
#[derive(Debug, Serialize)]
pub(crate) struct SignUpMetadata<'a> {
    pub full_name: &'a str,
    pub role: Role,
}

// =============================================================================
// Tables
// =============================================================================

/// A row of the `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub full_name: Option<String>,
    /// Missing or null roles read as [`Role::Buyer`].
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
}

impl Profile {
    /// Name for greetings, `"User"` when none was given.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or("User")
    }
}

/// Fields written to a profile after sign-up.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub role: Role,
}

/// The seller's name embedded through the `profiles:seller_id` join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerSummary {
    #[serde(default)]
    pub full_name: Option<String>,
}

/// A row of the `products` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    pub seller_id: UserId,
    pub created_at: DateTime<Utc>,
    /// Present only when the listing was fetched with the seller join.
    #[serde(rename = "profiles", default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<SellerSummary>,
}

impl Product {
    /// Seller name for display, `"Unknown Seller"` when unavailable.
    #[must_use]
    pub fn seller_name(&self) -> &str {
        self.seller
            .as_ref()
            .and_then(|s| s.full_name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Unknown Seller")
    }

    /// Description for display, with a placeholder when empty.
    #[must_use]
    pub fn description_or_default(&self) -> &str {
        self.description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("No description available.")
    }
}

/// Columns written when creating or editing a product.
///
/// `seller_id` is always the signed-in user; it is set on insert and used
/// as an additional filter on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub seller_id: UserId,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const USER_ID: &str = "2b0f3c4e-8d1a-4f7e-9a53-0c6d2e1b7a90";

    fn session(expires_at: Option<i64>) -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: Some(3600),
            expires_at,
            user: AuthUser {
                id: USER_ID.parse().unwrap(),
                email: Some("seller@example.com".to_string()),
            },
        }
    }

    #[test]
    fn test_expiry_uses_skew() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert!(!session(Some(1_700_000_000 + 120)).is_expired_at(now));
        assert!(session(Some(1_700_000_000 + 30)).is_expired_at(now));
        assert!(session(Some(1_699_999_000)).is_expired_at(now));
        assert!(!session(None).is_expired_at(now));
    }

    #[test]
    fn test_stamp_expiry_only_fills_missing() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(
            session(None).stamp_expiry(now).expires_at,
            Some(1_700_003_600)
        );
        assert_eq!(session(Some(5)).stamp_expiry(now).expires_at, Some(5));
    }

    #[test]
    fn test_session_debug_redacts_tokens() {
        let output = format!("{:?}", session(None));
        assert!(!output.contains("access\""));
        assert!(!output.contains("refresh\""));
        assert!(output.contains("[REDACTED]"));
    }

    #[test]
    fn test_sign_up_response_variants() {
        let with_session: SignUpResponse = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r",
            "expires_in": 3600,
            "user": { "id": USER_ID, "email": "new@example.com" }
        }))
        .unwrap();
        assert!(matches!(with_session, SignUpResponse::Session(_)));

        let user_only: SignUpResponse = serde_json::from_value(serde_json::json!({
            "id": USER_ID,
            "email": "new@example.com",
            "confirmation_sent_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert!(matches!(user_only, SignUpResponse::User(_)));
        assert_eq!(user_only.user().id.to_string(), USER_ID);
    }

    #[test]
    fn test_profile_null_role_defaults_to_buyer() {
        let profile: Profile = serde_json::from_value(serde_json::json!({
            "id": USER_ID,
            "full_name": null,
            "role": null
        }))
        .unwrap();
        assert_eq!(profile.role, Role::Buyer);
        assert_eq!(profile.display_name(), "User");
    }

    #[test]
    fn test_product_with_seller_join() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "7d9c2a51-3b64-4e0f-8a2d-5f1e6c7b8a94",
            "name": "Batik Shirt",
            "description": "",
            "price": 150000,
            "image_url": null,
            "seller_id": USER_ID,
            "created_at": "2024-05-01T10:00:00+00:00",
            "profiles": { "full_name": "Sari" }
        }))
        .unwrap();

        assert_eq!(product.price, Decimal::from(150_000));
        assert_eq!(product.seller_name(), "Sari");
        assert_eq!(product.description_or_default(), "No description available.");
    }

    #[test]
    fn test_product_without_join_has_unknown_seller() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "7d9c2a51-3b64-4e0f-8a2d-5f1e6c7b8a94",
            "name": "Kopi",
            "price": "25000.50",
            "seller_id": USER_ID,
            "created_at": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(product.seller_name(), "Unknown Seller");
        assert_eq!(product.description, None);
    }
}
