//! View data shared by every page: navbar, toasts and product cards.

use chrono::{DateTime, Utc};
use marketplace_core::{Currency, Price};

use crate::middleware::{CurrentSession, take_flashes};
use crate::models::session::Flash;
use crate::supabase::Product;

/// Fallback image for products without an upload.
pub const PLACEHOLDER_IMAGE: &str = "/static/img/placeholder.svg";

/// Navbar state.
#[derive(Clone, Debug, Default)]
pub struct NavView {
    pub signed_in: bool,
    /// Profile name or `"User"`.
    pub greeting_name: String,
    pub is_seller: bool,
}

/// Everything `base.html` needs.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    pub nav: NavView,
    /// Toasts rendered on this page.
    pub flashes: Vec<Flash>,
}

impl Layout {
    /// Build the layout for `current`, draining its pending toasts.
    pub async fn build(current: &CurrentSession) -> Self {
        let context = &current.context;
        Self {
            nav: NavView {
                signed_in: context.user.is_some(),
                greeting_name: context.display_name().to_string(),
                is_seller: context.is_seller(),
            },
            flashes: take_flashes(&current.session).await,
        }
    }

    /// Add a toast to this render without going through the session.
    #[must_use]
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flashes.push(flash);
        self
    }
}

/// A product as shown in listing grids.
#[derive(Clone, Debug)]
pub struct ProductCardView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    /// Lower-cased name and description for the live filter script.
    pub search_text: String,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, currency: Currency) -> Self {
        let description = product.description.clone().unwrap_or_default();
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            search_text: format!("{} {}", product.name, description).to_lowercase(),
            description,
            price: Price::new(product.price, currency).format(),
            image_url: image_or_placeholder(product.image_url.as_deref()),
        }
    }
}

/// `image_url` or the placeholder when missing or blank.
#[must_use]
pub fn image_or_placeholder(image_url: Option<&str>) -> String {
    image_url
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(PLACEHOLDER_IMAGE)
        .to_string()
}

/// Listing date as shown next to a product, e.g. `5 March 2025`.
#[must_use]
pub fn format_listed_on(created_at: DateTime<Utc>) -> String {
    created_at.format("%-d %B %Y").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use marketplace_core::{ProductId, UserId};
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_card_formats_price_and_search_text() {
        let product = Product {
            id: ProductId::random(),
            name: "Widget".to_string(),
            description: Some("Small BLUE thing".to_string()),
            price: Decimal::from(100),
            image_url: None,
            seller_id: UserId::random(),
            created_at: Utc::now(),
            seller: None,
        };

        let card = ProductCardView::new(&product, Currency::IDR);
        assert_eq!(card.price, "Rp\u{a0}100");
        assert_eq!(card.search_text, "widget small blue thing");
        assert_eq!(card.image_url, PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_image_or_placeholder() {
        assert_eq!(
            image_or_placeholder(Some("https://cdn/x.png")),
            "https://cdn/x.png"
        );
        assert_eq!(image_or_placeholder(Some("  ")), PLACEHOLDER_IMAGE);
        assert_eq!(image_or_placeholder(None), PLACEHOLDER_IMAGE);
    }

    #[test]
    fn test_format_listed_on() {
        let at = Utc.with_ymd_and_hms(2025, 3, 5, 23, 59, 0).unwrap();
        assert_eq!(format_listed_on(at), "5 March 2025");
    }
}
