//! Integration test harness for the marketplace storefront.
//!
//! Tests run the real storefront router against [`FakeBackend`], an
//! in-process stand-in for the hosted backend that speaks the same auth,
//! table and storage endpoints. Nothing outside the test process is needed:
//!
//! ```bash
//! cargo test -p marketplace-integration-tests
//! ```
//!
//! Each [`TestApp`] gets its own backend and its own auth rate limiter, so
//! a test may send at most five login/sign-up submissions.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use marketplace_core::Currency;
use marketplace_storefront::config::{SentryConfig, StorefrontConfig, SupabaseConfig};
use marketplace_storefront::middleware::create_session_layer;
use marketplace_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower_sessions::MemoryStore;
use uuid::Uuid;

/// Anon key the storefront is configured with in tests.
pub const ANON_KEY: &str = "test-anon-key";

/// Bucket the storefront uploads product images to in tests.
pub const BUCKET: &str = "product-images";

/// Columns the fake understands `eq.` filters on.
const FILTER_COLUMNS: &[&str] = &["id", "seller_id"];

// =============================================================================
// Fake backend
// =============================================================================

struct FakeUser {
    id: Uuid,
    email: String,
    password: String,
}

#[derive(Default)]
struct Tables {
    users: Vec<FakeUser>,
    /// Access token to user id.
    access_tokens: HashMap<String, Uuid>,
    /// Refresh token to user id.
    refresh_tokens: HashMap<String, Uuid>,
    profiles: Vec<Value>,
    products: Vec<Value>,
    objects: HashMap<String, Vec<u8>>,
}

#[derive(Default)]
struct CallCounts {
    sign_ups: AtomicUsize,
    sign_ins: AtomicUsize,
    sign_outs: AtomicUsize,
    uploads: AtomicUsize,
}

#[derive(Clone, Default)]
struct Backend {
    tables: Arc<Mutex<Tables>>,
    calls: Arc<CallCounts>,
    confirm_email: Arc<AtomicBool>,
}

impl Backend {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// User behind the request's bearer token; `None` for the anon key.
    fn caller(&self, headers: &HeaderMap) -> Option<Uuid> {
        let token = bearer(headers)?;
        self.tables().access_tokens.get(token).copied()
    }

    /// True when the bearer is neither the anon key nor a live access token.
    fn stale_bearer(&self, headers: &HeaderMap) -> bool {
        bearer(headers).is_some_and(|token| {
            token != ANON_KEY && !self.tables().access_tokens.contains_key(token)
        })
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// In-process backend serving `/auth/v1`, `/rest/v1` and `/storage/v1`.
pub struct FakeBackend {
    pub url: String,
    backend: Backend,
}

impl FakeBackend {
    /// Start the backend on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let backend = Backend::default();

        let router = Router::new()
            .route("/auth/v1/health", get(health))
            .route("/auth/v1/signup", post(sign_up))
            .route("/auth/v1/token", post(token))
            .route("/auth/v1/logout", post(logout))
            .route(
                "/rest/v1/{table}",
                get(select_rows)
                    .post(insert_row)
                    .patch(update_rows)
                    .delete(delete_rows),
            )
            .route("/storage/v1/object/{bucket}/{*path}", post(upload_object))
            .with_state(backend.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Fake backend has no address");
        tokio::spawn(async move { axum::serve(listener, router).await });

        Self {
            url: format!("http://{addr}"),
            backend,
        }
    }

    /// Make sign-up return a bare user instead of a session.
    pub fn require_email_confirmation(&self) {
        self.backend.confirm_email.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn sign_up_calls(&self) -> usize {
        self.backend.calls.sign_ups.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_in_calls(&self) -> usize {
        self.backend.calls.sign_ins.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.backend.calls.sign_outs.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn upload_calls(&self) -> usize {
        self.backend.calls.uploads.load(Ordering::SeqCst)
    }

    /// Id of the product named `name`.
    #[must_use]
    pub fn product_id(&self, name: &str) -> Option<String> {
        self.backend
            .tables()
            .products
            .iter()
            .find(|row| row["name"] == name)
            .and_then(|row| row["id"].as_str().map(String::from))
    }

    /// Stored row of the product named `name`.
    #[must_use]
    pub fn product(&self, name: &str) -> Option<Value> {
        self.backend
            .tables()
            .products
            .iter()
            .find(|row| row["name"] == name)
            .cloned()
    }

    #[must_use]
    pub fn product_count(&self) -> usize {
        self.backend.tables().products.len()
    }

    /// Stored profile row for the account registered as `email`.
    #[must_use]
    pub fn profile_for(&self, email: &str) -> Option<Value> {
        let tables = self.backend.tables();
        let user = tables.users.iter().find(|u| u.email == email)?;
        let id = user.id.to_string();
        tables
            .profiles
            .iter()
            .find(|row| row["id"] == id.as_str())
            .cloned()
    }

    /// Object paths in the image bucket.
    #[must_use]
    pub fn object_paths(&self) -> Vec<String> {
        self.backend.tables().objects.keys().cloned().collect()
    }

    /// Expire every issued access token, as if time had passed.
    pub fn revoke_access_tokens(&self) {
        self.backend.tables().access_tokens.clear();
    }
}

fn api_error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn issue_session(tables: &mut Tables, user_id: Uuid, email: &str) -> Value {
    let access_token = format!("access-{}", Uuid::new_v4());
    let refresh_token = format!("refresh-{}", Uuid::new_v4());
    tables.access_tokens.insert(access_token.clone(), user_id);
    tables.refresh_tokens.insert(refresh_token.clone(), user_id);

    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": Utc::now().timestamp() + 3600,
        "user": { "id": user_id, "email": email },
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "name": "GoTrue", "description": "fake" }))
}

async fn sign_up(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    backend.calls.sign_ups.fetch_add(1, Ordering::SeqCst);

    let email = body["email"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();
    let mut tables = backend.tables();

    if tables.users.iter().any(|u| u.email == email) {
        return api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "code": 422, "msg": "User already registered" }),
        );
    }

    let id = Uuid::new_v4();
    tables.users.push(FakeUser {
        id,
        email: email.clone(),
        password,
    });
    // Profile trigger: metadata lands on the new row
    tables.profiles.push(json!({
        "id": id,
        "full_name": body["data"]["full_name"],
        "role": body["data"]["role"],
    }));

    if backend.confirm_email.load(Ordering::SeqCst) {
        return Json(json!({ "id": id, "email": email })).into_response();
    }
    Json(issue_session(&mut tables, id, &email)).into_response()
}

async fn token(
    State(backend): State<Backend>,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let mut tables = backend.tables();

    match params.get("grant_type").map(String::as_str) {
        Some("password") => {
            backend.calls.sign_ins.fetch_add(1, Ordering::SeqCst);
            let found = tables
                .users
                .iter()
                .find(|u| body["email"] == u.email.as_str() && body["password"] == u.password.as_str())
                .map(|u| (u.id, u.email.clone()));
            match found {
                Some((id, email)) => Json(issue_session(&mut tables, id, &email)).into_response(),
                None => api_error(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }),
                ),
            }
        }
        Some("refresh_token") => {
            let presented = body["refresh_token"].as_str().unwrap_or_default();
            let Some(id) = tables.refresh_tokens.remove(presented) else {
                return api_error(
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "invalid_grant", "error_description": "Invalid Refresh Token" }),
                );
            };
            let email = tables
                .users
                .iter()
                .find(|u| u.id == id)
                .map(|u| u.email.clone())
                .unwrap_or_default();
            Json(issue_session(&mut tables, id, &email)).into_response()
        }
        _ => api_error(
            StatusCode::BAD_REQUEST,
            json!({ "error": "unsupported_grant_type" }),
        ),
    }
}

async fn logout(State(backend): State<Backend>, headers: HeaderMap) -> StatusCode {
    backend.calls.sign_outs.fetch_add(1, Ordering::SeqCst);
    if let Some(token) = bearer(&headers) {
        backend.tables().access_tokens.remove(token);
    }
    StatusCode::NO_CONTENT
}

fn matches_filters(row: &Value, params: &HashMap<String, String>) -> bool {
    FILTER_COLUMNS.iter().all(|column| {
        params
            .get(*column)
            .and_then(|value| value.strip_prefix("eq."))
            .is_none_or(|expected| row[*column] == expected)
    })
}

fn wants_single(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("vnd.pgrst.object"))
}

fn wants_representation(headers: &HeaderMap) -> bool {
    headers
        .get("prefer")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("return=representation"))
}

fn rows_response(rows: Vec<Value>, headers: &HeaderMap) -> Response {
    if !wants_single(headers) {
        return Json(Value::Array(rows)).into_response();
    }
    match <[Value; 1]>::try_from(rows) {
        Ok([row]) => Json(row).into_response(),
        Err(_) => api_error(
            StatusCode::NOT_ACCEPTABLE,
            json!({
                "code": "PGRST116",
                "message": "JSON object requested, multiple (or no) rows returned",
            }),
        ),
    }
}

async fn select_rows(
    State(backend): State<Backend>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if backend.stale_bearer(&headers) {
        return api_error(
            StatusCode::UNAUTHORIZED,
            json!({ "code": "PGRST301", "message": "JWT expired" }),
        );
    }

    let tables = backend.tables();
    let source = match table.as_str() {
        "products" => &tables.products,
        "profiles" => &tables.profiles,
        _ => return api_error(StatusCode::NOT_FOUND, json!({ "message": "unknown table" })),
    };

    let mut rows: Vec<Value> = source
        .iter()
        .filter(|row| matches_filters(row, &params))
        .cloned()
        .collect();

    if params.get("order").is_some_and(|o| o == "created_at.desc") {
        rows.sort_by(|a, b| {
            b["created_at"]
                .as_str()
                .cmp(&a["created_at"].as_str())
        });
    }

    let embed_seller = params
        .get("select")
        .is_some_and(|s| s.contains("profiles:seller_id"));
    if embed_seller {
        for row in &mut rows {
            let seller = tables
                .profiles
                .iter()
                .find(|p| p["id"] == row["seller_id"])
                .map(|p| json!({ "full_name": p["full_name"] }))
                .unwrap_or(Value::Null);
            row["profiles"] = seller;
        }
    }

    rows_response(rows, &headers)
}

async fn insert_row(
    State(backend): State<Backend>,
    Path(table): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if table != "products" {
        return api_error(StatusCode::FORBIDDEN, json!({ "message": "insert not allowed" }));
    }
    let Some(caller) = backend.caller(&headers) else {
        return api_error(StatusCode::UNAUTHORIZED, json!({ "message": "JWT expired" }));
    };
    if body["seller_id"] != caller.to_string().as_str() {
        return api_error(
            StatusCode::FORBIDDEN,
            json!({ "message": "new row violates row-level security policy" }),
        );
    }

    let row = json!({
        "id": Uuid::new_v4(),
        "name": body["name"],
        "description": body["description"],
        "price": body["price"],
        "image_url": body["image_url"],
        "seller_id": body["seller_id"],
        "created_at": Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
    });
    backend.tables().products.push(row.clone());

    let status = StatusCode::CREATED;
    if wants_single(&headers) {
        (status, Json(row)).into_response()
    } else {
        (status, Json(json!([row]))).into_response()
    }
}

async fn update_rows(
    State(backend): State<Backend>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let caller = backend.caller(&headers);
    let mut tables = backend.tables();
    let (rows, owner_column) = match table.as_str() {
        "products" => (&mut tables.products, Some("seller_id")),
        "profiles" => (&mut tables.profiles, None),
        _ => return api_error(StatusCode::NOT_FOUND, json!({ "message": "unknown table" })),
    };

    let mut updated = Vec::new();
    for row in rows.iter_mut() {
        if !matches_filters(row, &params) {
            continue;
        }
        // Row-level security: only the owner may change a product
        if let Some(column) = owner_column {
            let owned = caller.is_some_and(|id| row[column] == id.to_string().as_str());
            if !owned {
                continue;
            }
        }
        if let (Some(target), Some(changes)) = (row.as_object_mut(), body.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        updated.push(row.clone());
    }

    if wants_representation(&headers) {
        Json(Value::Array(updated)).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn delete_rows(
    State(backend): State<Backend>,
    Path(table): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if table != "products" {
        return api_error(StatusCode::FORBIDDEN, json!({ "message": "delete not allowed" }));
    }
    let caller = backend.caller(&headers).map(|id| id.to_string());
    let mut tables = backend.tables();

    let (removed, kept): (Vec<Value>, Vec<Value>) =
        std::mem::take(&mut tables.products)
            .into_iter()
            .partition(|row| {
                matches_filters(row, &params)
                    && caller
                        .as_deref()
                        .is_some_and(|id| row["seller_id"] == id)
            });
    tables.products = kept;

    if wants_representation(&headers) {
        Json(Value::Array(removed)).into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn upload_object(
    State(backend): State<Backend>,
    Path((bucket, path)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    backend.calls.uploads.fetch_add(1, Ordering::SeqCst);
    if backend.caller(&headers).is_none() {
        return api_error(
            StatusCode::BAD_REQUEST,
            json!({ "statusCode": "403", "error": "Unauthorized", "message": "new row violates row-level security policy" }),
        );
    }
    if bucket != BUCKET {
        return api_error(
            StatusCode::NOT_FOUND,
            json!({ "statusCode": "404", "error": "Bucket not found", "message": "Bucket not found" }),
        );
    }

    let mut tables = backend.tables();
    if tables.objects.contains_key(&path) {
        return api_error(
            StatusCode::CONFLICT,
            json!({ "statusCode": "409", "error": "Duplicate", "message": "The resource already exists" }),
        );
    }
    tables.objects.insert(path.clone(), body.to_vec());
    Json(json!({ "Key": format!("{bucket}/{path}") })).into_response()
}

// =============================================================================
// Storefront under test
// =============================================================================

/// Storefront configuration pointing at `backend_url`.
///
/// # Panics
///
/// Panics if `backend_url` is not a valid URL.
#[must_use]
pub fn test_config(backend_url: &str) -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        session_secret: SecretString::from("kX9#mQ2$vL7@nR4!pW8&jT3*hY6^bZ1%"),
        database_url: None,
        static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../storefront/static"),
        currency: Currency::IDR,
        supabase: SupabaseConfig {
            url: url::Url::parse(backend_url).expect("Invalid backend URL"),
            anon_key: SecretString::from(ANON_KEY),
            storage_bucket: BUCKET.to_string(),
        },
        sentry: SentryConfig::default(),
    }
}

/// A running storefront wired to its own [`FakeBackend`].
pub struct TestApp {
    pub url: String,
    pub backend: FakeBackend,
}

impl TestApp {
    /// Start a backend and a storefront with in-memory sessions.
    ///
    /// # Panics
    ///
    /// Panics if either server cannot be bound or the backend client
    /// cannot be built.
    pub async fn spawn() -> Self {
        let backend = FakeBackend::start().await;
        let config = test_config(&backend.url);
        Self::serve(backend, config).await
    }

    /// Start a storefront whose backend URL refuses connections.
    ///
    /// # Panics
    ///
    /// Panics if a server or a spare port cannot be bound.
    pub async fn spawn_with_backend_down() -> Self {
        let backend = FakeBackend::start().await;
        let closed = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .expect("Failed to reserve a port");
        Self::serve(backend, test_config(&format!("http://{closed}"))).await
    }

    async fn serve(backend: FakeBackend, config: StorefrontConfig) -> Self {
        let session_layer = create_session_layer(MemoryStore::default(), &config);
        let state = AppState::new(config).expect("Failed to build app state");
        let app = marketplace_storefront::app(state, session_layer);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind storefront");
        let addr = listener.local_addr().expect("Storefront has no address");
        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
        });

        Self {
            url: format!("http://{addr}"),
            backend,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }

    /// A browser-like client: keeps cookies and follows redirects.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    pub fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    /// Submit the sign-up form.
    ///
    /// # Panics
    ///
    /// Panics if the request fails to send.
    pub async fn sign_up(
        &self,
        client: &reqwest::Client,
        full_name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> reqwest::Response {
        client
            .post(self.url("/signup"))
            .form(&[
                ("full_name", full_name),
                ("email", email),
                ("password", password),
                ("confirm_password", password),
                ("role", role),
            ])
            .send()
            .await
            .expect("Sign-up request failed")
    }

    /// Submit the login form.
    ///
    /// # Panics
    ///
    /// Panics if the request fails to send.
    pub async fn login(
        &self,
        client: &reqwest::Client,
        email: &str,
        password: &str,
    ) -> reqwest::Response {
        client
            .post(self.url("/login"))
            .form(&[("email", email), ("password", password)])
            .send()
            .await
            .expect("Login request failed")
    }

    /// Submit the create-product form without an image.
    ///
    /// # Panics
    ///
    /// Panics if the request fails to send.
    pub async fn create_product(
        &self,
        client: &reqwest::Client,
        name: &str,
        description: &str,
        price: &str,
    ) -> reqwest::Response {
        let form = reqwest::multipart::Form::new()
            .text("name", name.to_string())
            .text("description", description.to_string())
            .text("price", price.to_string());
        client
            .post(self.url("/dashboard/products"))
            .multipart(form)
            .send()
            .await
            .expect("Create product request failed")
    }
}
