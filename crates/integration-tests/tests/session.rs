//! Session bootstrap against stored sessions: refresh, sign-out, profile loss.

use std::sync::Arc;

use marketplace_core::Role;
use marketplace_integration_tests::{FakeBackend, test_config};
use marketplace_storefront::models::session::keys;
use marketplace_storefront::services::session_context::{bootstrap, stored_session};
use marketplace_storefront::supabase::{AuthSession, SignUpResponse, SupabaseClient};
use tower_sessions::{MemoryStore, Session};

fn fresh_session() -> Session {
    Session::new(None, Arc::new(MemoryStore::default()), None)
}

async fn seller_session(client: &SupabaseClient) -> AuthSession {
    let response = client
        .sign_up("rina@example.com", "secret1", "Rina", Role::Seller)
        .await
        .expect("sign-up failed");
    match response {
        SignUpResponse::Session(auth) => auth,
        SignUpResponse::User(_) => panic!("expected a session from sign-up"),
    }
}

#[tokio::test]
async fn test_expired_token_is_refreshed() {
    let backend = FakeBackend::start().await;
    let client = SupabaseClient::new(&test_config(&backend.url).supabase).expect("client");
    let mut auth = seller_session(&client).await;
    let old_token = auth.access_token.clone();
    auth.expires_at = Some(0);

    let session = fresh_session();
    session.insert(keys::AUTH_SESSION, &auth).await.expect("insert");

    let context = bootstrap(&session, &client).await.expect("bootstrap");

    let user = context.user.as_ref().expect("still signed in");
    assert_eq!(user.id, auth.user.id);
    assert_ne!(context.access_token(), Some(old_token.as_str()));
    assert_eq!(context.role(), Some(Role::Seller));

    let stored = stored_session(&session)
        .await
        .expect("read")
        .expect("session kept");
    assert_eq!(Some(stored.access_token.as_str()), context.access_token());
    assert!(!stored.is_expired());
}

#[tokio::test]
async fn test_failed_refresh_signs_out() {
    let backend = FakeBackend::start().await;
    let client = SupabaseClient::new(&test_config(&backend.url).supabase).expect("client");
    let mut auth = seller_session(&client).await;

    // Rotating the refresh token once leaves the stored one unusable
    client
        .refresh_session(&auth.refresh_token)
        .await
        .expect("first refresh");
    auth.expires_at = Some(0);

    let session = fresh_session();
    session.insert(keys::AUTH_SESSION, &auth).await.expect("insert");

    let context = bootstrap(&session, &client).await.expect("bootstrap");

    assert!(context.user.is_none());
    assert!(context.access_token().is_none());
    assert!(!context.loading);
    assert!(stored_session(&session).await.expect("read").is_none());
}

#[tokio::test]
async fn test_profile_fetch_failure_leaves_profile_empty() {
    let backend = FakeBackend::start().await;
    let client = SupabaseClient::new(&test_config(&backend.url).supabase).expect("client");
    let auth = seller_session(&client).await;
    backend.revoke_access_tokens();

    let session = fresh_session();
    session.insert(keys::AUTH_SESSION, &auth).await.expect("insert");

    let context = bootstrap(&session, &client).await.expect("bootstrap");

    assert_eq!(context.user.as_ref().map(|u| u.id), Some(auth.user.id));
    assert!(context.profile.is_none());
    assert!(!context.is_seller());
    assert_eq!(context.display_name(), "User");
    // The token was still within its lifetime, so nothing was refreshed
    assert_eq!(context.access_token(), Some(auth.access_token.as_str()));
}
