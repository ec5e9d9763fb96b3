//! Shared HTTP plumbing for the backend client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

use super::{ApiErrorBody, SupabaseError};
use crate::config::SupabaseConfig;

/// `PostgREST` media type that returns a single object instead of an array.
pub(super) const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Time allowed to establish a connection to the backend.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the backend's auth, table and storage services.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    http: reqwest::Client,
    /// Project URL, always ending in `/` so relative joins keep any path prefix.
    base: Url,
    anon_key: SecretString,
    bucket: String,
}

impl SupabaseClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`SupabaseError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SupabaseConfig) -> Result<Self, SupabaseError> {
        let mut base = config.url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                http,
                base,
                anon_key: config.anon_key.clone(),
                bucket: config.storage_bucket.clone(),
            }),
        })
    }

    /// Storage bucket for product images.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.inner.bucket
    }

    /// Resolve a path such as `rest/v1/products` against the project URL.
    pub(super) fn endpoint(&self, path: &str) -> Result<Url, SupabaseError> {
        Ok(self.inner.base.join(path.trim_start_matches('/'))?)
    }

    /// Start a request with the `apikey` and bearer headers set.
    ///
    /// Requests without a user token authenticate as the anonymous role.
    pub(super) fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        let anon_key = self.inner.anon_key.expose_secret();
        let token = bearer.unwrap_or(anon_key);

        self.inner
            .http
            .request(method, url)
            .header("apikey", anon_key)
            .bearer_auth(token)
    }

    /// Send a request and decode a JSON body.
    pub(super) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, SupabaseError> {
        let response = check_status(request.send().await?).await?;
        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            SupabaseError::Parse(e)
        })
    }

    /// Send a request and discard the body.
    pub(super) async fn send_empty(&self, request: RequestBuilder) -> Result<(), SupabaseError> {
        check_status(request.send().await?).await?;
        Ok(())
    }
}

/// Map non-success responses to [`SupabaseError`].
async fn check_status(response: Response) -> Result<Response, SupabaseError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(SupabaseError::RateLimited(retry_after));
    }

    let url = response.url().path().to_string();
    let text = response.text().await.unwrap_or_default();

    // A single-object read that matched zero rows
    if status == StatusCode::NOT_ACCEPTABLE {
        return Err(SupabaseError::NotFound(url));
    }

    let message = ApiErrorBody::from_text(&text).describe();
    if status.is_server_error() {
        tracing::error!(status = %status, path = %url, message = %message, "Backend returned server error");
    } else {
        tracing::debug!(status = %status, path = %url, message = %message, "Backend rejected request");
    }

    Err(SupabaseError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(url: &str) -> SupabaseClient {
        SupabaseClient::new(&SupabaseConfig {
            url: Url::parse(url).unwrap(),
            anon_key: SecretString::from("anon-key-for-tests"),
            storage_bucket: "product-images".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_project_url() {
        let client = client("https://abcd.supabase.co");
        assert_eq!(
            client.endpoint("/rest/v1/products").unwrap().as_str(),
            "https://abcd.supabase.co/rest/v1/products"
        );
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let client = client("http://127.0.0.1:8080/backend");
        assert_eq!(
            client.endpoint("auth/v1/signup").unwrap().as_str(),
            "http://127.0.0.1:8080/backend/auth/v1/signup"
        );
    }

    #[test]
    fn test_request_sets_auth_headers() {
        let client = client("https://abcd.supabase.co");
        let url = client.endpoint("rest/v1/products").unwrap();

        let anon = client.request(Method::GET, url.clone(), None).build().unwrap();
        assert_eq!(anon.headers()["apikey"], "anon-key-for-tests");
        assert_eq!(anon.headers()["authorization"], "Bearer anon-key-for-tests");

        let user = client
            .request(Method::GET, url, Some("user-jwt"))
            .build()
            .unwrap();
        assert_eq!(user.headers()["apikey"], "anon-key-for-tests");
        assert_eq!(user.headers()["authorization"], "Bearer user-jwt");
    }
}
