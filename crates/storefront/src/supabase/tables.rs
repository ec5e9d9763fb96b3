//! `PostgREST` table access for `profiles` and `products`.
//!
//! Filters use `PostgREST` operators (`id=eq.{uuid}`). Reads that expect
//! one row ask for the single-object media type, which turns "no rows" into
//! a 406 that the client maps to [`SupabaseError::NotFound`].

use marketplace_core::{ProductId, UserId};
use reqwest::Method;
use tracing::instrument;
use url::Url;

use super::client::SINGLE_OBJECT;
use super::types::{Product, ProductInput, Profile, ProfileUpdate};
use super::{SupabaseClient, SupabaseError};

/// Product columns plus the seller's name through the `seller_id` foreign key.
const PRODUCT_WITH_SELLER: &str = "*,profiles:seller_id(full_name)";

const RETURN_REPRESENTATION: &str = "return=representation";

impl SupabaseClient {
    fn table_url(&self, table: &str, params: &[(&str, &str)]) -> Result<Url, SupabaseError> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// All products, newest first, with seller names.
    #[instrument(skip(self, token))]
    pub async fn list_products(&self, token: Option<&str>) -> Result<Vec<Product>, SupabaseError> {
        let url = self.table_url(
            "products",
            &[("select", PRODUCT_WITH_SELLER), ("order", "created_at.desc")],
        )?;
        self.send_json(self.request(Method::GET, url, token)).await
    }

    /// One product with its seller name.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn get_product(
        &self,
        id: ProductId,
        token: Option<&str>,
    ) -> Result<Product, SupabaseError> {
        let filter = format!("eq.{id}");
        let url = self.table_url(
            "products",
            &[("select", PRODUCT_WITH_SELLER), ("id", &filter)],
        )?;
        self.send_json(
            self.request(Method::GET, url, token)
                .header(reqwest::header::ACCEPT, SINGLE_OBJECT),
        )
        .await
        .map_err(|e| not_found_as(e, format!("product {id}")))
    }

    /// Products owned by `seller_id`, newest first.
    #[instrument(skip(self, token), fields(seller_id = %seller_id))]
    pub async fn list_seller_products(
        &self,
        seller_id: UserId,
        token: &str,
    ) -> Result<Vec<Product>, SupabaseError> {
        let filter = format!("eq.{seller_id}");
        let url = self.table_url(
            "products",
            &[
                ("select", "*"),
                ("seller_id", &filter),
                ("order", "created_at.desc"),
            ],
        )?;
        self.send_json(self.request(Method::GET, url, Some(token)))
            .await
    }

    /// Create a product and return the stored row.
    #[instrument(skip(self, input, token), fields(name = %input.name))]
    pub async fn insert_product(
        &self,
        input: &ProductInput,
        token: &str,
    ) -> Result<Product, SupabaseError> {
        let url = self.table_url("products", &[])?;
        self.send_json(
            self.request(Method::POST, url, Some(token))
                .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
                .header("Prefer", RETURN_REPRESENTATION)
                .json(input),
        )
        .await
    }

    /// Update a product owned by `input.seller_id`.
    ///
    /// Returns [`SupabaseError::NotFound`] when no row matched both the id
    /// and the owner.
    #[instrument(skip(self, input, token), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
        token: &str,
    ) -> Result<Product, SupabaseError> {
        let id_filter = format!("eq.{id}");
        let seller_filter = format!("eq.{}", input.seller_id);
        let url = self.table_url("products", &[("id", &id_filter), ("seller_id", &seller_filter)])?;

        let rows: Vec<Product> = self
            .send_json(
                self.request(Method::PATCH, url, Some(token))
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(input),
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| SupabaseError::NotFound(format!("product {id}")))
    }

    /// Delete a product owned by `seller_id`.
    #[instrument(skip(self, token), fields(product_id = %id))]
    pub async fn delete_product(
        &self,
        id: ProductId,
        seller_id: UserId,
        token: &str,
    ) -> Result<(), SupabaseError> {
        let id_filter = format!("eq.{id}");
        let seller_filter = format!("eq.{seller_id}");
        let url = self.table_url("products", &[("id", &id_filter), ("seller_id", &seller_filter)])?;

        let rows: Vec<serde_json::Value> = self
            .send_json(
                self.request(Method::DELETE, url, Some(token))
                    .header("Prefer", RETURN_REPRESENTATION),
            )
            .await?;
        if rows.is_empty() {
            return Err(SupabaseError::NotFound(format!("product {id}")));
        }
        Ok(())
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// The profile row for `user_id`.
    #[instrument(skip(self, token), fields(user_id = %user_id))]
    pub async fn fetch_profile(
        &self,
        user_id: UserId,
        token: &str,
    ) -> Result<Profile, SupabaseError> {
        let filter = format!("eq.{user_id}");
        let url = self.table_url("profiles", &[("select", "*"), ("id", &filter)])?;
        self.send_json(
            self.request(Method::GET, url, Some(token))
                .header(reqwest::header::ACCEPT, SINGLE_OBJECT),
        )
        .await
        .map_err(|e| not_found_as(e, format!("profile {user_id}")))
    }

    /// Set name and role on the profile row for `user_id`.
    #[instrument(skip(self, update, token), fields(user_id = %user_id, role = %update.role))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
        token: Option<&str>,
    ) -> Result<(), SupabaseError> {
        let filter = format!("eq.{user_id}");
        let url = self.table_url("profiles", &[("id", &filter)])?;
        self.send_empty(self.request(Method::PATCH, url, token).json(update))
            .await
    }
}

/// Replace the request path in a not-found error with a readable subject.
fn not_found_as(err: SupabaseError, subject: String) -> SupabaseError {
    match err {
        SupabaseError::NotFound(_) => SupabaseError::NotFound(subject),
        other => other,
    }
}
