//! Seller product management and the public catalogue.

use marketplace_integration_tests::TestApp;
use reqwest::StatusCode;

const NBSP: char = '\u{a0}';

async fn signed_in_seller(app: &TestApp, name: &str, email: &str) -> reqwest::Client {
    let client = TestApp::client();
    let resp = app.sign_up(&client, name, email, "secret1", "seller").await;
    assert_eq!(resp.url().path(), "/");
    client
}

#[tokio::test]
async fn test_created_product_shows_on_dashboard_and_home() {
    let app = TestApp::spawn().await;
    let seller = signed_in_seller(&app, "Sari", "sari@example.com").await;

    let resp = app
        .create_product(&seller, "Widget", "A small widget", "100")
        .await;
    assert_eq!(resp.url().path(), "/dashboard");
    let body = resp.text().await.expect("body");
    assert!(body.contains("Product created successfully!"));
    assert!(body.contains("Widget"));
    assert!(body.contains(&format!("Rp{NBSP}100")));

    let stored = app.backend.product("Widget").expect("stored row");
    assert_eq!(stored["description"], "A small widget");
    assert!(stored["image_url"].is_null());

    let home = TestApp::client()
        .get(app.url("/"))
        .send()
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body");
    assert!(home.contains("Widget"));
    assert!(home.contains("/static/img/placeholder.svg"));
}

#[tokio::test]
async fn test_dashboard_only_lists_own_products() {
    let app = TestApp::spawn().await;
    let sari = signed_in_seller(&app, "Sari", "sari@example.com").await;
    let tono = signed_in_seller(&app, "Tono", "tono@example.com").await;

    app.create_product(&sari, "Widget", "", "100").await;
    app.create_product(&sari, "Gadget", "", "250").await;
    app.create_product(&tono, "Doohickey", "", "150000").await;

    let body = sari
        .get(app.url("/dashboard"))
        .send()
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body");
    assert!(body.contains("Widget"));
    assert!(body.contains("Gadget"));
    assert!(!body.contains("Doohickey"));
    assert!(body.contains(&format!("Rp{NBSP}350")));

    let body = tono
        .get(app.url("/dashboard"))
        .send()
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body");
    assert!(body.contains("Doohickey"));
    assert!(body.contains(&format!("Rp{NBSP}150.000")));
    assert!(!body.contains("Widget"));
}

#[tokio::test]
async fn test_invalid_product_form_is_rejected() {
    let app = TestApp::spawn().await;
    let seller = signed_in_seller(&app, "Sari", "sari@example.com").await;

    let resp = app.create_product(&seller, "Widget", "", "-5").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = resp.text().await.expect("body");
    assert!(body.contains("price cannot be negative"));
    // The form keeps what was typed
    assert!(body.contains("value=\"Widget\""));

    let resp = app.create_product(&seller, "   ", "", "10").await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.text().await.expect("body").contains("Product name is required"));

    assert_eq!(app.backend.product_count(), 0);
}

#[tokio::test]
async fn test_product_image_is_uploaded() {
    let app = TestApp::spawn().await;
    let seller = signed_in_seller(&app, "Sari", "sari@example.com").await;

    let image = reqwest::multipart::Part::bytes(b"\x89PNG fake".to_vec())
        .file_name("photo.png")
        .mime_str("image/png")
        .expect("mime");
    let form = reqwest::multipart::Form::new()
        .text("name", "Lamp")
        .text("description", "")
        .text("price", "75")
        .part("image", image);
    let resp = seller
        .post(app.url("/dashboard/products"))
        .multipart(form)
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.url().path(), "/dashboard");

    assert_eq!(app.backend.upload_calls(), 1);
    let paths = app.backend.object_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with("products/"));
    assert!(paths[0].ends_with(".png"));

    let stored = app.backend.product("Lamp").expect("stored row");
    let image_url = stored["image_url"].as_str().expect("image url");
    assert!(image_url.contains("/storage/v1/object/public/product-images/products/"));
}

#[tokio::test]
async fn test_non_image_upload_is_rejected() {
    let app = TestApp::spawn().await;
    let seller = signed_in_seller(&app, "Sari", "sari@example.com").await;

    let file = reqwest::multipart::Part::bytes(b"hello".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")
        .expect("mime");
    let form = reqwest::multipart::Form::new()
        .text("name", "Notes")
        .text("price", "5")
        .part("image", file);
    let resp = seller
        .post(app.url("/dashboard/products"))
        .multipart(form)
        .send()
        .await
        .expect("request failed");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.backend.upload_calls(), 0);
    assert_eq!(app.backend.product_count(), 0);
}

#[tokio::test]
async fn test_edit_updates_product_and_keeps_image() {
    let app = TestApp::spawn().await;
    let seller = signed_in_seller(&app, "Sari", "sari@example.com").await;
    app.create_product(&seller, "Widget", "", "100").await;
    let id = app.backend.product_id("Widget").expect("product id");

    let edit_page = seller
        .get(app.url(&format!("/dashboard/products/{id}/edit")))
        .send()
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body");
    assert!(edit_page.contains("Edit Product"));
    assert!(edit_page.contains("value=\"Widget\""));

    let form = reqwest::multipart::Form::new()
        .text("name", "Widget Pro")
        .text("description", "Now bigger")
        .text("price", "120");
    let resp = seller
        .post(app.url(&format!("/dashboard/products/{id}")))
        .multipart(form)
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.url().path(), "/dashboard");
    let body = resp.text().await.expect("body");
    assert!(body.contains("Product updated successfully!"));
    assert!(body.contains("Widget Pro"));
    assert!(body.contains(&format!("Rp{NBSP}120")));

    let stored = app.backend.product("Widget Pro").expect("stored row");
    assert_eq!(stored["id"], id.as_str());
    assert!(stored["image_url"].is_null());
}

#[tokio::test]
async fn test_other_seller_cannot_edit_or_delete() {
    let app = TestApp::spawn().await;
    let sari = signed_in_seller(&app, "Sari", "sari@example.com").await;
    let tono = signed_in_seller(&app, "Tono", "tono@example.com").await;
    app.create_product(&sari, "Widget", "", "100").await;
    let id = app.backend.product_id("Widget").expect("product id");

    let resp = tono
        .get(app.url(&format!("/dashboard/products/{id}/edit")))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.url().path(), "/dashboard");

    let resp = tono
        .post(app.url(&format!("/dashboard/products/{id}/delete")))
        .send()
        .await
        .expect("request failed");
    let body = resp.text().await.expect("body");
    assert!(body.contains("Failed to delete product"));
    assert_eq!(app.backend.product_count(), 1);
}

#[tokio::test]
async fn test_delete_removes_product() {
    let app = TestApp::spawn().await;
    let seller = signed_in_seller(&app, "Sari", "sari@example.com").await;
    app.create_product(&seller, "Widget", "", "100").await;
    let id = app.backend.product_id("Widget").expect("product id");

    let resp = seller
        .post(app.url(&format!("/dashboard/products/{id}/delete")))
        .send()
        .await
        .expect("request failed");
    assert_eq!(resp.url().path(), "/dashboard");
    let body = resp.text().await.expect("body");
    assert!(body.contains("Product deleted successfully!"));
    assert!(body.contains("No products yet"));
    assert_eq!(app.backend.product_count(), 0);

    let home = TestApp::client()
        .get(app.url("/"))
        .send()
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body");
    assert!(home.contains("No products available"));
}

#[tokio::test]
async fn test_product_detail_shows_seller() {
    let app = TestApp::spawn().await;
    let seller = signed_in_seller(&app, "Sari", "sari@example.com").await;
    app.create_product(&seller, "Widget", "", "100").await;
    let id = app.backend.product_id("Widget").expect("product id");

    let body = TestApp::client()
        .get(app.url(&format!("/product/{id}")))
        .send()
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body");
    assert!(body.contains("Widget"));
    assert!(body.contains("Sari"));
    assert!(body.contains("No description available."));
    assert!(body.contains(&format!("Rp{NBSP}100")));
}

#[tokio::test]
async fn test_unknown_product_redirects_home() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    for id in ["not-a-uuid".to_string(), uuid::Uuid::new_v4().to_string()] {
        let resp = client
            .get(app.url(&format!("/product/{id}")))
            .send()
            .await
            .expect("request failed");
        assert_eq!(resp.url().path(), "/");
        let body = resp.text().await.expect("body");
        assert!(body.contains("Product not found"));
    }
}

#[tokio::test]
async fn test_search_is_case_insensitive() {
    let app = TestApp::spawn().await;
    let seller = signed_in_seller(&app, "Sari", "sari@example.com").await;
    app.create_product(&seller, "Blue Widget", "", "100").await;
    app.create_product(&seller, "Red Lamp", "glows BLUE at night", "200").await;
    app.create_product(&seller, "Green Chair", "", "300").await;

    let client = TestApp::client();
    let body = client
        .get(app.url("/?q=bLuE"))
        .send()
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body");
    assert!(body.contains("Blue Widget"));
    assert!(body.contains("Red Lamp"));
    assert!(!body.contains("Green Chair"));

    let body = client
        .get(app.url("/?q=sofa"))
        .send()
        .await
        .expect("request failed")
        .text()
        .await
        .expect("body");
    assert!(body.contains("No products found"));
    assert!(body.contains("Try different search terms"));
}
