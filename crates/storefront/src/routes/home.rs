//! Home page: the full product listing with search.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use crate::filters;
use crate::middleware::CurrentSession;
use crate::models::session::Flash;
use crate::routes::layout::{Layout, ProductCardView};
use crate::search::{filter_products, normalize_term};
use crate::state::AppState;

/// Search query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub query: String,
    pub searching: bool,
    pub products: Vec<ProductCardView>,
}

/// Display the product listing, filtered by `?q=` when given.
#[instrument(skip(state, current))]
pub async fn home(
    State(state): State<AppState>,
    current: CurrentSession,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::build(&current).await;

    let products = match state
        .supabase()
        .list_products(current.context.access_token())
        .await
    {
        Ok(products) => products,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load products");
            layout = layout.with_flash(Flash::error("Failed to load products"));
            Vec::new()
        }
    };

    let currency = state.config().currency;
    let products = filter_products(products, &query.q)
        .iter()
        .map(|p| ProductCardView::new(p, currency))
        .collect();

    HomeTemplate {
        layout,
        searching: normalize_term(&query.q).is_some(),
        query: query.q,
        products,
    }
}
