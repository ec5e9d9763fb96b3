//! Product detail and the add-to-cart placeholder.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use marketplace_core::{Price, ProductId};
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::auth::{AccessState, GuardDecision, Requirement, decide};
use crate::middleware::{CurrentSession, flash_error, flash_success};
use crate::routes::layout::{Layout, format_listed_on, image_or_placeholder};
use crate::state::AppState;
use crate::supabase::{Product, SupabaseError};

/// Product display data for the detail page.
#[derive(Clone, Debug)]
pub struct ProductDetailView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    pub seller_name: String,
    pub listed_on: String,
}

impl ProductDetailView {
    fn new(product: &Product, state: &AppState) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description_or_default().to_string(),
            price: Price::new(product.price, state.config().currency).format(),
            image_url: image_or_placeholder(product.image_url.as_deref()),
            seller_name: product.seller_name().to_string(),
            listed_on: format_listed_on(product.created_at),
        }
    }
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductDetailView,
}

/// Display a single product.
///
/// Unknown or malformed ids, and load failures, send the visitor home with
/// a "Product not found" toast.
#[instrument(skip(state, current))]
pub async fn show(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<String>,
) -> Response {
    let Ok(product_id) = id.parse::<ProductId>() else {
        return not_found(&current).await;
    };

    match state
        .supabase()
        .get_product(product_id, current.context.access_token())
        .await
    {
        Ok(product) => ProductShowTemplate {
            product: ProductDetailView::new(&product, &state),
            layout: Layout::build(&current).await,
        }
        .into_response(),
        Err(SupabaseError::NotFound(_)) => not_found(&current).await,
        Err(e) => {
            tracing::error!(error = %e, product_id = %product_id, "Failed to load product");
            not_found(&current).await
        }
    }
}

async fn not_found(current: &CurrentSession) -> Response {
    flash_error(&current.session, "Product not found").await;
    Redirect::to("/").into_response()
}

/// Handle the "Add to Cart" button.
///
/// There is no cart yet: signed-in visitors get a notice, everyone else is
/// asked to log in.
#[instrument(skip(current))]
pub async fn add_to_cart(current: CurrentSession, Path(id): Path<String>) -> Response {
    let back = id
        .parse::<ProductId>()
        .map_or_else(|_| "/".to_string(), |id| format!("/product/{id}"));

    match decide(AccessState::of(&current.context), Requirement::SignedIn) {
        GuardDecision::Allow => {
            add_breadcrumb("cart", "Add to cart", Some(&[("product_id", id.as_str())]));
            flash_success(
                &current.session,
                "Added to cart! (Cart functionality coming soon)",
            )
            .await;
            Redirect::to(&back).into_response()
        }
        GuardDecision::RedirectToLogin => {
            flash_error(&current.session, "Please login to add items to cart").await;
            Redirect::to("/login").into_response()
        }
        GuardDecision::Wait | GuardDecision::RedirectHome => Redirect::to(&back).into_response(),
    }
}
