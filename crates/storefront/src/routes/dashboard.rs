//! Seller dashboard: list, create, edit and delete the seller's products.
//!
//! Every handler sits behind [`RequireSeller`]. Writes carry the seller's
//! access token and are additionally filtered by `seller_id`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use marketplace_core::{Currency, Price, PriceError, ProductId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{CurrentSession, RequireSeller, flash_error, flash_success};
use crate::models::session::Flash;
use crate::routes::layout::{Layout, format_listed_on, image_or_placeholder};
use crate::state::AppState;
use crate::supabase::{Product, ProductInput, SupabaseError, product_image_path};

/// Largest accepted image upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

// =============================================================================
// Form handling
// =============================================================================

/// An image file picked in the product form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Raw product form fields, as submitted.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub image: Option<UploadedImage>,
}

/// Product form fields after validation.
#[derive(Debug, Clone)]
pub struct ValidProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
}

/// Why a product form was rejected.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Product name is required")]
    MissingName,
    #[error("{0}")]
    Price(#[from] PriceError),
    #[error("Please choose an image file")]
    NotAnImage,
    #[error("Image is too large (max 5 MB)")]
    ImageTooLarge,
    #[error("Could not read the submitted form")]
    Multipart(#[from] MultipartError),
}

impl ProductForm {
    /// Read the multipart body of the product form.
    ///
    /// An empty file input counts as "no new image".
    ///
    /// # Errors
    ///
    /// Returns [`FormError`] for unreadable bodies, non-image uploads and
    /// uploads over [`MAX_IMAGE_BYTES`].
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, FormError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "name" => form.name = field.text().await?,
                "description" => form.description = field.text().await?,
                "price" => form.price = field.text().await?,
                "image" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field.bytes().await?;
                    if file_name.is_empty() || bytes.is_empty() {
                        continue;
                    }
                    form.image = Some(UploadedImage {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Check the text fields and the optional image.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<ValidProduct, FormError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(FormError::MissingName);
        }
        let price = Price::parse_amount(&self.price)?;

        if let Some(image) = &self.image {
            if !image.content_type.starts_with("image/") {
                return Err(FormError::NotAnImage);
            }
            if image.bytes.len() > MAX_IMAGE_BYTES {
                return Err(FormError::ImageTooLarge);
            }
        }

        let description = self.description.trim();
        Ok(ValidProduct {
            name: name.to_string(),
            description: (!description.is_empty()).then(|| description.to_string()),
            price,
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// A row of the seller's product table.
#[derive(Clone, Debug)]
pub struct DashboardRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    pub listed_on: String,
}

impl DashboardRow {
    fn new(product: &Product, currency: Currency) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: Price::new(product.price, currency).format(),
            image_url: image_or_placeholder(product.image_url.as_deref()),
            listed_on: format_listed_on(product.created_at),
        }
    }
}

/// Dashboard overview template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/index.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub products: Vec<DashboardRow>,
    pub total_products: usize,
    pub total_value: String,
}

/// Create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard/form.html")]
pub struct ProductFormTemplate {
    pub layout: Layout,
    /// Form target: `/dashboard/products` or `/dashboard/products/{id}`.
    pub action: String,
    pub editing: bool,
    pub name: String,
    pub description: String,
    pub price: String,
    pub current_image: Option<String>,
}

impl ProductFormTemplate {
    fn blank(layout: Layout) -> Self {
        Self {
            layout,
            action: "/dashboard/products".to_string(),
            editing: false,
            name: String::new(),
            description: String::new(),
            price: String::new(),
            current_image: None,
        }
    }

    fn for_product(layout: Layout, product: &Product) -> Self {
        Self {
            layout,
            action: format!("/dashboard/products/{}", product.id),
            editing: true,
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: product.price.normalize().to_string(),
            current_image: product.image_url.clone(),
        }
    }

    /// Put the submitted values back into the form.
    fn refill(mut self, form: &ProductForm) -> Self {
        self.name.clone_from(&form.name);
        self.description.clone_from(&form.description);
        self.price.clone_from(&form.price);
        self
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// The signed-in seller's id and access token.
fn seller(current: &CurrentSession) -> Option<(UserId, &str)> {
    let user = current.context.user.as_ref()?;
    Some((user.id, current.context.access_token()?))
}

fn session_lost() -> Response {
    Redirect::to("/login").into_response()
}

/// Display the seller's products and totals.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    RequireSeller(current): RequireSeller,
) -> Response {
    let Some((seller_id, token)) = seller(&current) else {
        return session_lost();
    };
    let mut layout = Layout::build(&current).await;

    let products = match state
        .supabase()
        .list_seller_products(seller_id, token)
        .await
    {
        Ok(products) => products,
        Err(e) => {
            tracing::error!(error = %e, seller_id = %seller_id, "Failed to load seller products");
            layout = layout.with_flash(Flash::error("Failed to load products"));
            Vec::new()
        }
    };

    let currency = state.config().currency;
    DashboardTemplate {
        layout,
        total_products: products.len(),
        total_value: Price::total(products.iter().map(|p| p.price), currency).format(),
        products: products
            .iter()
            .map(|p| DashboardRow::new(p, currency))
            .collect(),
    }
    .into_response()
}

/// Display an empty product form.
pub async fn new_product(RequireSeller(current): RequireSeller) -> Response {
    ProductFormTemplate::blank(Layout::build(&current).await).into_response()
}

/// Create a product.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    RequireSeller(current): RequireSeller,
    multipart: Multipart,
) -> Response {
    let Some((seller_id, token)) = seller(&current) else {
        return session_lost();
    };

    let form = match ProductForm::from_multipart(multipart).await {
        Ok(form) => form,
        Err(e) => return form_error(&current, ProductFormTemplate::blank, &e).await,
    };
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(e) => {
            return form_error(&current, |l| ProductFormTemplate::blank(l).refill(&form), &e)
                .await;
        }
    };

    let result: Result<Product, SupabaseError> = async {
        let image_url = match &form.image {
            Some(image) => Some(upload_image(&state, image, token).await?),
            None => None,
        };
        let input = ProductInput {
            name: valid.name,
            description: valid.description,
            price: valid.price,
            image_url,
            seller_id,
        };
        state.supabase().insert_product(&input, token).await
    }
    .await;

    match result {
        Ok(product) => {
            tracing::info!(product_id = %product.id, seller_id = %seller_id, "Product created");
            add_breadcrumb("dashboard", "Created product", None);
            flash_success(&current.session, "Product created successfully!").await;
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, seller_id = %seller_id, "Failed to save product");
            save_failed(&current, ProductFormTemplate::blank, &form).await
        }
    }
}

/// Display the edit form for one of the seller's products.
#[instrument(skip(state, current))]
pub async fn edit(
    State(state): State<AppState>,
    RequireSeller(current): RequireSeller,
    Path(id): Path<String>,
) -> Response {
    match owned_product(&state, &current, &id).await {
        Ok(product) => {
            ProductFormTemplate::for_product(Layout::build(&current).await, &product)
                .into_response()
        }
        Err(response) => response,
    }
}

/// Update one of the seller's products.
///
/// Without a new upload the product keeps its current image.
#[instrument(skip(state, current, multipart))]
pub async fn update(
    State(state): State<AppState>,
    RequireSeller(current): RequireSeller,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let existing = match owned_product(&state, &current, &id).await {
        Ok(product) => product,
        Err(response) => return response,
    };
    let Some((seller_id, token)) = seller(&current) else {
        return session_lost();
    };
    let editing = |layout: Layout| ProductFormTemplate::for_product(layout, &existing);

    let form = match ProductForm::from_multipart(multipart).await {
        Ok(form) => form,
        Err(e) => return form_error(&current, editing, &e).await,
    };
    let valid = match form.validate() {
        Ok(valid) => valid,
        Err(e) => return form_error(&current, |l| editing(l).refill(&form), &e).await,
    };

    let result: Result<Product, SupabaseError> = async {
        let image_url = match &form.image {
            Some(image) => Some(upload_image(&state, image, token).await?),
            None => existing.image_url.clone(),
        };
        let input = ProductInput {
            name: valid.name,
            description: valid.description,
            price: valid.price,
            image_url,
            seller_id,
        };
        state
            .supabase()
            .update_product(existing.id, &input, token)
            .await
    }
    .await;

    match result {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Product updated");
            add_breadcrumb("dashboard", "Updated product", None);
            flash_success(&current.session, "Product updated successfully!").await;
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, product_id = %existing.id, "Failed to save product");
            save_failed(&current, editing, &form).await
        }
    }
}

/// Delete one of the seller's products.
#[instrument(skip(state, current))]
pub async fn delete(
    State(state): State<AppState>,
    RequireSeller(current): RequireSeller,
    Path(id): Path<String>,
) -> Response {
    let Some((seller_id, token)) = seller(&current) else {
        return session_lost();
    };

    let result = match id.parse::<ProductId>() {
        Ok(product_id) => state
            .supabase()
            .delete_product(product_id, seller_id, token)
            .await,
        Err(e) => Err(SupabaseError::NotFound(e.to_string())),
    };

    match result {
        Ok(()) => {
            tracing::info!(product_id = %id, "Product deleted");
            add_breadcrumb("dashboard", "Deleted product", Some(&[("product_id", id.as_str())]));
            flash_success(&current.session, "Product deleted successfully!").await;
        }
        Err(e) => {
            tracing::warn!(error = %e, product_id = %id, "Failed to delete product");
            flash_error(&current.session, "Failed to delete product").await;
        }
    }

    Redirect::to("/dashboard").into_response()
}

// =============================================================================
// Helpers
// =============================================================================

/// Upload a product image and return its public URL.
async fn upload_image(
    state: &AppState,
    image: &UploadedImage,
    token: &str,
) -> Result<String, SupabaseError> {
    let path = product_image_path(&image.file_name, Utc::now().timestamp_millis());
    state
        .supabase()
        .upload_object(&path, image.bytes.clone(), &image.content_type, token)
        .await
}

/// Load a product and check it belongs to the signed-in seller.
///
/// Anything else redirects to the dashboard with a toast.
async fn owned_product(
    state: &AppState,
    current: &CurrentSession,
    id: &str,
) -> Result<Product, Response> {
    let Some((seller_id, token)) = seller(current) else {
        return Err(session_lost());
    };

    let found = match id.parse::<ProductId>() {
        Ok(product_id) => state
            .supabase()
            .get_product(product_id, Some(token))
            .await
            .ok()
            .filter(|product| product.seller_id == seller_id),
        Err(_) => None,
    };

    match found {
        Some(product) => Ok(product),
        None => {
            flash_error(&current.session, "Product not found").await;
            Err(Redirect::to("/dashboard").into_response())
        }
    }
}

/// Re-render the form with a validation error.
async fn form_error(
    current: &CurrentSession,
    template: impl FnOnce(Layout) -> ProductFormTemplate,
    err: &FormError,
) -> Response {
    let layout = Layout::build(current)
        .await
        .with_flash(Flash::error(err.to_string()));
    (StatusCode::UNPROCESSABLE_ENTITY, template(layout)).into_response()
}

/// Re-render the form after the backend rejected the save.
async fn save_failed(
    current: &CurrentSession,
    template: impl FnOnce(Layout) -> ProductFormTemplate,
    form: &ProductForm,
) -> Response {
    let layout = Layout::build(current)
        .await
        .with_flash(Flash::error("Failed to save product"));
    (StatusCode::BAD_GATEWAY, template(layout).refill(form)).into_response()
}
