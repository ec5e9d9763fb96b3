//! Object storage for product images.

use reqwest::Method;
use tracing::instrument;

use super::{SupabaseClient, SupabaseError};

impl SupabaseClient {
    /// Upload `bytes` to `path` inside the product image bucket.
    ///
    /// Returns the public URL of the stored object.
    #[instrument(skip(self, bytes, token), fields(size = bytes.len()))]
    pub async fn upload_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        token: &str,
    ) -> Result<String, SupabaseError> {
        let url = self.endpoint(&format!("storage/v1/object/{}/{path}", self.bucket()))?;
        self.send_empty(
            self.request(Method::POST, url, Some(token))
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .header("x-upsert", "false")
                .body(bytes),
        )
        .await?;
        self.public_url(path)
    }

    /// Public URL for an object in the product image bucket.
    pub fn public_url(&self, path: &str) -> Result<String, SupabaseError> {
        Ok(self
            .endpoint(&format!(
                "storage/v1/object/public/{}/{path}",
                self.bucket()
            ))?
            .to_string())
    }
}

/// Object path for a newly uploaded image: `products/{millis}.{ext}`.
///
/// The extension is whatever follows the last `.` of the original file
/// name, or the whole name when it has none.
#[must_use]
pub fn product_image_path(file_name: &str, millis: i64) -> String {
    let ext = file_name
        .rsplit_once('.')
        .map_or(file_name, |(_, ext)| ext);
    format!("products/{millis}.{ext}")
}
