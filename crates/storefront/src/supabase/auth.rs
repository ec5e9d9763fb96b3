//! Auth service endpoints (`/auth/v1`).

use chrono::Utc;
use marketplace_core::Role;
use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use super::types::{AuthSession, SignUpMetadata, SignUpRequest, SignUpResponse};
use super::{SupabaseClient, SupabaseError};

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

impl SupabaseClient {
    /// Register a new account.
    ///
    /// `full_name` and `role` are stored as user metadata; the profile row
    /// is written separately once the user exists.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        role: Role,
    ) -> Result<SignUpResponse, SupabaseError> {
        let url = self.endpoint("auth/v1/signup")?;
        let body = SignUpRequest {
            email,
            password,
            data: SignUpMetadata { full_name, role },
        };

        let response: SignUpResponse = self
            .send_json(self.request(Method::POST, url, None).json(&body))
            .await?;

        Ok(match response {
            SignUpResponse::Session(session) => {
                SignUpResponse::Session(session.stamp_expiry(Utc::now()))
            }
            user @ SignUpResponse::User(_) => user,
        })
    }

    /// Exchange email and password for a session.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, SupabaseError> {
        let url = self.token_url("password")?;
        let session: AuthSession = self
            .send_json(
                self.request(Method::POST, url, None)
                    .json(&PasswordGrant { email, password }),
            )
            .await?;
        Ok(session.stamp_expiry(Utc::now()))
    }

    /// Exchange a refresh token for a fresh session.
    #[instrument(skip_all)]
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, SupabaseError> {
        let url = self.token_url("refresh_token")?;
        let session: AuthSession = self
            .send_json(
                self.request(Method::POST, url, None)
                    .json(&RefreshGrant { refresh_token }),
            )
            .await?;
        Ok(session.stamp_expiry(Utc::now()))
    }

    /// Revoke the session behind `access_token`.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, access_token: &str) -> Result<(), SupabaseError> {
        let url = self.endpoint("auth/v1/logout")?;
        self.send_empty(self.request(Method::POST, url, Some(access_token)))
            .await
    }

    /// Check that the auth service is reachable.
    pub async fn health(&self) -> Result<(), SupabaseError> {
        let url = self.endpoint("auth/v1/health")?;
        self.send_empty(self.request(Method::GET, url, None)).await
    }

    fn token_url(&self, grant_type: &str) -> Result<url::Url, SupabaseError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }
}
