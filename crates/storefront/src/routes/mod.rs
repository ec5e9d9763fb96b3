//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                               - Product listing (?q= search)
//! GET  /product/{id}                   - Product detail
//! POST /product/{id}/cart              - Add to cart (placeholder)
//!
//! # Auth
//! GET  /login                          - Login page
//! POST /login                          - Login action (rate limited)
//! GET  /signup                         - Sign-up page
//! POST /signup                         - Sign-up action (rate limited)
//! POST /logout                         - Sign out
//!
//! # Seller dashboard (seller role required)
//! GET  /dashboard                      - Seller's products and totals
//! GET  /dashboard/products/new         - Create form
//! POST /dashboard/products             - Create action
//! GET  /dashboard/products/{id}/edit   - Edit form
//! POST /dashboard/products/{id}        - Update action
//! POST /dashboard/products/{id}/delete - Delete action
//! ```

pub mod auth;
pub mod dashboard;
pub mod home;
pub mod layout;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Headroom for the text fields sent alongside an image.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let submissions = Router::new()
        .route("/login", post(auth::login))
        .route("/signup", post(auth::signup));

    let submissions = match auth_rate_limiter() {
        Some(limiter) => submissions.layer(limiter),
        None => {
            tracing::error!("Auth rate limiter configuration rejected, serving without it");
            submissions
        }
    };

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/signup", get(auth::signup_page))
        .route("/logout", post(auth::logout))
        .merge(submissions)
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(products::show))
        .route("/{id}/cart", post(products::add_to_cart))
}

/// Create the seller dashboard router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/products", post(dashboard::create))
        .route("/products/new", get(dashboard::new_product))
        .route("/products/{id}", post(dashboard::update))
        .route("/products/{id}/edit", get(dashboard::edit))
        .route("/products/{id}/delete", post(dashboard::delete))
        .layer(DefaultBodyLimit::max(
            dashboard::MAX_IMAGE_BYTES + FORM_OVERHEAD_BYTES,
        ))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .nest("/product", product_routes())
        .nest("/dashboard", dashboard_routes())
        .merge(auth_routes())
}
