//! Product search.
//!
//! The listing page fetches every product once and filters in process.
//! A product matches when the term appears in its name or description,
//! ignoring case. Surrounding whitespace is dropped and blank terms match
//! everything.

use crate::supabase::Product;

/// Normalized search term, `None` when blank.
#[must_use]
pub fn normalize_term(term: &str) -> Option<String> {
    let term = term.trim();
    (!term.is_empty()).then(|| term.to_lowercase())
}

/// Whether `product` matches an already-normalized term.
#[must_use]
pub fn matches(product: &Product, needle: &str) -> bool {
    product.name.to_lowercase().contains(needle)
        || product
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(needle))
}

/// Keep the products matching `term`, preserving order.
#[must_use]
pub fn filter_products(products: Vec<Product>, term: &str) -> Vec<Product> {
    match normalize_term(term) {
        None => products,
        Some(needle) => products
            .into_iter()
            .filter(|p| matches(p, &needle))
            .collect(),
    }
}
