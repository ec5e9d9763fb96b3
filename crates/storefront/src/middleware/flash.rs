//! One-shot toast notifications stored in the session.
//!
//! Handlers push a [`Flash`] before redirecting; the next rendered page
//! drains the queue. Session failures are logged and otherwise ignored so
//! a broken store never turns a notification into an error page.

use tower_sessions::Session;

use crate::models::session::{Flash, keys};

/// Queue a notification for the next rendered page.
pub async fn push_flash(session: &Session, flash: Flash) {
    let mut pending = match session.get::<Vec<Flash>>(keys::FLASH).await {
        Ok(pending) => pending.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read flash queue");
            Vec::new()
        }
    };
    pending.push(flash);

    if let Err(e) = session.insert(keys::FLASH, pending).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Queue a success toast.
pub async fn flash_success(session: &Session, message: impl Into<String>) {
    push_flash(session, Flash::success(message)).await;
}

/// Queue an error toast.
pub async fn flash_error(session: &Session, message: impl Into<String>) {
    push_flash(session, Flash::error(message)).await;
}

/// Remove and return all pending notifications.
pub async fn take_flashes(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(keys::FLASH).await {
        Ok(pending) => pending.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to drain flash queue");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::models::session::FlashKind;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_flashes_are_shown_once_in_order() {
        let session = session();
        flash_success(&session, "Product created successfully!").await;
        flash_error(&session, "Failed to delete product").await;

        let shown = take_flashes(&session).await;
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].kind, FlashKind::Success);
        assert_eq!(shown[0].message, "Product created successfully!");
        assert_eq!(shown[1].kind, FlashKind::Error);

        assert!(take_flashes(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_queue() {
        assert!(take_flashes(&session()).await.is_empty());
    }
}
