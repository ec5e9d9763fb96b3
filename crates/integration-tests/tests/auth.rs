//! Sign-up, login and logout through the storefront forms.

use marketplace_integration_tests::TestApp;
use reqwest::StatusCode;

#[tokio::test]
async fn test_signup_password_mismatch_never_reaches_backend() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let resp = client
        .post(app.url("/signup"))
        .form(&[
            ("full_name", "Ana"),
            ("email", "ana@example.com"),
            ("password", "secret1"),
            ("confirm_password", "secret2"),
            ("role", "buyer"),
        ])
        .send()
        .await
        .expect("request failed");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.expect("body");
    assert!(body.contains("Passwords do not match"));
    // Entered values are kept
    assert!(body.contains("ana@example.com"));
    assert_eq!(app.backend.sign_up_calls(), 0);
}

#[tokio::test]
async fn test_signup_short_password_never_reaches_backend() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let resp = app
        .sign_up(&client, "Ana", "ana@example.com", "abc", "buyer")
        .await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.expect("body");
    assert!(body.contains("Password must be at least 6 characters"));
    assert_eq!(app.backend.sign_up_calls(), 0);
}

#[tokio::test]
async fn test_signup_signs_in_and_stores_profile() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let resp = app
        .sign_up(&client, "Ana Seller", "ana@example.com", "secret1", "seller")
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.url().path(), "/");
    let body = resp.text().await.expect("body");
    assert!(body.contains("Account created successfully!"));
    assert!(body.contains("Hello, Ana Seller"));
    assert!(body.contains("href=\"/dashboard\""));

    let profile = app
        .backend
        .profile_for("ana@example.com")
        .expect("profile row");
    assert_eq!(profile["full_name"], "Ana Seller");
    assert_eq!(profile["role"], "seller");
}

#[tokio::test]
async fn test_duplicate_signup_is_rejected() {
    let app = TestApp::spawn().await;

    let first = app
        .sign_up(&TestApp::client(), "Ana", "ana@example.com", "secret1", "buyer")
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .sign_up(&TestApp::client(), "Ana", "ana@example.com", "secret1", "buyer")
        .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    let body = second.text().await.expect("body");
    assert!(body.contains("User already registered"));
}

#[tokio::test]
async fn test_signup_awaiting_confirmation_goes_to_login() {
    let app = TestApp::spawn().await;
    app.backend.require_email_confirmation();
    let client = TestApp::client();

    let resp = app
        .sign_up(&client, "Ana", "ana@example.com", "secret1", "buyer")
        .await;

    assert_eq!(resp.url().path(), "/login");
    let body = resp.text().await.expect("body");
    assert!(body.contains("Check your email"));
    assert!(!body.contains("Hello, Ana"));
}

#[tokio::test]
async fn test_login_logout_round() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    app.sign_up(&client, "Budi", "budi@example.com", "secret1", "buyer")
        .await;
    let resp = client
        .post(app.url("/logout"))
        .send()
        .await
        .expect("logout failed");
    let body = resp.text().await.expect("body");
    assert!(body.contains("Signed out successfully!"));
    assert!(body.contains("href=\"/login\""));
    assert_eq!(app.backend.sign_out_calls(), 1);

    let wrong = app.login(&client, "budi@example.com", "wrong-pass").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let body = wrong.text().await.expect("body");
    assert!(body.contains("Invalid login credentials"));
    assert!(body.contains("budi@example.com"));

    let right = app.login(&client, "budi@example.com", "secret1").await;
    assert_eq!(right.url().path(), "/");
    let body = right.text().await.expect("body");
    assert!(body.contains("Logged in successfully!"));
    assert!(body.contains("Hello, Budi"));
    assert_eq!(app.backend.sign_in_calls(), 2);
}

#[tokio::test]
async fn test_login_page_redirects_signed_in_visitors() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();
    app.sign_up(&client, "Ana", "ana@example.com", "secret1", "buyer")
        .await;

    let resp = client
        .get(app.url("/login"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.url().path(), "/");
}
