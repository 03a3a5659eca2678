//! Catalog, chat, giveaways, blog, balance and admin endpoints

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use common::TestApp;
use gamehub_server::models::UserRole;

#[tokio::test]
async fn test_health_and_security_headers() {
    let app = TestApp::new();

    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.router.clone(), request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");

    let (_, health) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_product_lifecycle() {
    let app = TestApp::new();
    let seller = app.seed_user(UserRole::Seller, None).await;
    let buyer = app.seed_user(UserRole::Buyer, None).await;
    let seller_token = app.token(&seller);
    let product = json!({ "title": "Space Racer Key", "price": 19.99, "stock": 3 });

    let (status, created) = app
        .send(Method::POST, "/api/products", Some(&seller_token), Some(product))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["seller_id"], seller.id.to_string());
    let uri = format!("/api/products/{}", created["id"].as_str().unwrap());

    let (status, fetched) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Space Racer Key");

    let (status, listed) = app
        .send(Method::GET, "/api/products?search=racer", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            Method::PUT,
            &uri,
            Some(&app.token(&buyer)),
            Some(json!({ "price": 1.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .send(Method::PUT, &uri, Some(&seller_token), Some(json!({ "price": 24.5 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["price"], 24.5);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&seller_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_any_role_can_list_a_product() {
    let app = TestApp::new();
    let buyer = app.seed_user(UserRole::Buyer, None).await;
    let other = app.seed_user(UserRole::Buyer, None).await;
    let token = app.token(&buyer);

    let (status, created) = app
        .send(
            Method::POST,
            "/api/products",
            Some(&token),
            Some(json!({ "title": "Spare Skin Code", "price": 4.5, "stock": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["seller_id"], buyer.id.to_string());
    let uri = format!("/api/products/{}", created["id"].as_str().unwrap());

    let (status, _) = app
        .send(Method::DELETE, &uri, Some(&app.token(&other)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .send(Method::PUT, &uri, Some(&token), Some(json!({ "stock": 2 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["stock"], 2);
}

#[tokio::test]
async fn test_order_quantity_bounds() {
    let app = TestApp::new();
    let seller = app.seed_user(UserRole::Seller, None).await;
    let buyer = app.seed_user(UserRole::Buyer, None).await;
    let product = app.seed_product(&seller, 1.0, 5).await;
    let token = app.token(&buyer);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/orders",
            Some(&token),
            Some(json!({ "items": [
                { "product_id": product.id, "quantity": i64::MAX },
                { "product_id": product.id, "quantity": 1 }
            ] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/orders",
            Some(&token),
            Some(json!({ "items": [{ "product_id": product.id, "quantity": 0 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, order) = app
        .send(
            Method::POST,
            "/api/orders",
            Some(&token),
            Some(json!({ "items": [
                { "product_id": product.id, "quantity": 6000 },
                { "product_id": product.id, "quantity": 4000 }
            ] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["items"][0]["quantity"], 10000);
}

#[tokio::test]
async fn test_orders_snapshot_catalog_prices() {
    let app = TestApp::new();
    let seller = app.seed_user(UserRole::Seller, None).await;
    let buyer = app.seed_user(UserRole::Buyer, None).await;
    let stranger = app.seed_user(UserRole::Buyer, None).await;
    let admin = app.seed_user(UserRole::Admin, None).await;
    let product = app.seed_product(&seller, 7.25, 10).await;
    let token = app.token(&buyer);

    let (status, order) = app
        .send(
            Method::POST,
            "/api/orders",
            Some(&token),
            Some(json!({ "items": [
                { "product_id": product.id, "quantity": 1, "price": 0.01 },
                { "product_id": product.id, "quantity": 2 }
            ] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert_eq!(order["items"][0]["quantity"], 3);
    assert_eq!(order["total"], 21.75);
    assert_eq!(order["status"], "pending");

    let uri = format!("/api/orders/{}", order["id"].as_str().unwrap());
    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .send(Method::GET, &uri, Some(&app.token(&stranger)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::GET, &uri, Some(&app.token(&admin)), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, mine) = app.send(Method::GET, "/api/orders/my", Some(&token), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/orders",
            Some(&token),
            Some(json!({ "items": [{ "product_id": uuid::Uuid::new_v4(), "quantity": 1 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favorites_and_viewed() {
    let app = TestApp::new();
    let seller = app.seed_user(UserRole::Seller, None).await;
    let buyer = app.seed_user(UserRole::Buyer, None).await;
    let product = app.seed_product(&seller, 5.0, 1).await;
    let token = app.token(&buyer);

    let favorite_uri = format!("/api/favorites?product_id={}", product.id);
    let (status, _) = app.send(Method::POST, &favorite_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::POST, &favorite_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, favorites) = app.send(Method::GET, "/api/favorites/my", Some(&token), None).await;
    assert_eq!(favorites.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/favorites/{}", product.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, favorites) = app.send(Method::GET, "/api/favorites/my", Some(&token), None).await;
    assert!(favorites.as_array().unwrap().is_empty());

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/viewed/{}", product.id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, viewed) = app.send(Method::GET, "/api/viewed/my", Some(&token), None).await;
    assert_eq!(viewed[0]["id"], product.id.to_string());
}

#[tokio::test]
async fn test_chat_between_buyer_and_seller() {
    let app = TestApp::new();
    let seller = app.seed_user(UserRole::Seller, Some(4242)).await;
    let buyer = app.seed_user(UserRole::Buyer, None).await;
    let outsider = app.seed_user(UserRole::Buyer, None).await;
    let product = app.seed_product(&seller, 5.0, 1).await;
    let buyer_token = app.token(&buyer);
    let seller_token = app.token(&seller);

    let open_uri = format!("/api/chats?seller_id={}&product_id={}", seller.id, product.id);
    let (status, chat) = app.send(Method::POST, &open_uri, Some(&buyer_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, again) = app.send(Method::POST, &open_uri, Some(&buyer_token), None).await;
    assert_eq!(again["id"], chat["id"]);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/chats?seller_id={}", seller.id),
            Some(&seller_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let messages_uri = format!("/api/chats/{}/messages", chat["id"].as_str().unwrap());
    let (status, _) = app
        .send(
            Method::POST,
            &messages_uri,
            Some(&buyer_token),
            Some(json!({ "content": "Is the key region-free?" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.notifier.sent_to(4242).len(), 1);

    let (_, chats) = app.send(Method::GET, "/api/chats", Some(&seller_token), None).await;
    assert_eq!(chats[0]["unread_count"], 1);
    assert_eq!(chats[0]["last_message"], "Is the key region-free?");
    assert_eq!(chats[0]["other_user"]["id"], buyer.id.to_string());

    let (_, history) = app.send(Method::GET, &messages_uri, Some(&seller_token), None).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    let (_, chats) = app.send(Method::GET, "/api/chats", Some(&seller_token), None).await;
    assert_eq!(chats[0]["unread_count"], 0);

    let (status, _) = app
        .send(Method::GET, &messages_uri, Some(&app.token(&outsider)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            &messages_uri,
            Some(&seller_token),
            Some(json!({ "content": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_giveaway_entry_over_http() {
    let app = TestApp::new();
    let admin = app.seed_user(UserRole::Admin, None).await;
    let buyer = app.seed_user(UserRole::Buyer, None).await;
    let admin_token = app.token(&admin);
    let buyer_token = app.token(&buyer);

    let body = json!({
        "title": "Weekend drop",
        "end_date": Utc::now() + Duration::days(1),
    });
    let (status, _) = app
        .send(Method::POST, "/api/giveaways", Some(&buyer_token), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, giveaway) = app
        .send(Method::POST, "/api/admin/giveaways", Some(&admin_token), Some(body))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(giveaway["status"], "active");

    let enter_uri = format!("/api/giveaways/enter/{}", giveaway["id"].as_str().unwrap());
    let (_, first) = app.send(Method::POST, &enter_uri, Some(&buyer_token), None).await;
    assert_eq!(first["message"], "Entered giveaway");
    let (_, second) = app.send(Method::POST, &enter_uri, Some(&buyer_token), None).await;
    assert_eq!(second["message"], "Already entered");

    let (_, listed) = app.send(Method::GET, "/api/giveaways", None, None).await;
    assert_eq!(listed[0]["entries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_blog_publishing() {
    let app = TestApp::new();
    let admin = app.seed_user(UserRole::Admin, None).await;
    let admin_token = app.token(&admin);
    let post = json!({ "title": "Patch notes", "slug": "patch-notes", "content": "Fixes." });

    let (status, created) = app
        .send(Method::POST, "/api/blog", Some(&admin_token), Some(post.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, error) = app
        .send(Method::POST, "/api/admin/blog", Some(&admin_token), Some(post))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "CONFLICT");

    let (status, fetched) = app.send(Method::GET, "/api/blog/patch-notes", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["author_id"], admin.id.to_string());

    let post_uri = format!("/api/blog/{}", created["id"].as_str().unwrap());
    let (status, _) = app.send(Method::DELETE, &post_uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::GET, "/api/blog/patch-notes", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_balance_deposit_and_withdrawal() {
    let app = TestApp::new();
    let buyer = app.seed_user(UserRole::Buyer, None).await;
    let token = app.token(&buyer);

    let (status, deposit) = app
        .send(
            Method::POST,
            "/api/balance/deposit",
            Some(&token),
            Some(json!({ "amount": 50.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deposit["new_balance"], 50.0);
    assert_eq!(deposit["status"], "completed");

    let (status, error) = app
        .send(
            Method::POST,
            "/api/balance/withdrawal",
            Some(&token),
            Some(json!({ "amount": 80.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "INVALID_STATE");

    let (status, withdrawal) = app
        .send(
            Method::POST,
            "/api/balance/withdrawal",
            Some(&token),
            Some(json!({ "amount": 20.0, "account_details": "IBAN XX00" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(withdrawal["status"], "pending");

    let (_, balance) = app.send(Method::GET, "/api/balance", Some(&token), None).await;
    assert_eq!(balance["balance"], 30.0);

    let (_, transactions) = app.send(Method::GET, "/api/transactions", Some(&token), None).await;
    assert_eq!(transactions.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_panel() {
    let app = TestApp::new();
    let admin = app.seed_user(UserRole::Admin, None).await;
    let seller = app.seed_user(UserRole::Seller, None).await;
    let buyer = app.seed_user(UserRole::Buyer, None).await;
    app.seed_product(&seller, 10.0, 1).await;
    let admin_token = app.token(&admin);

    let (status, _) = app
        .send(Method::GET, "/api/admin/stats", Some(&app.token(&buyer)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, stats) = app.send(Method::GET, "/api/admin/stats", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_users"], 3);
    assert_eq!(stats["total_products"], 1);
    assert_eq!(stats["total_revenue"], 0.0);

    let (status, promoted) = app
        .send(
            Method::PUT,
            &format!("/api/admin/users/{}/role?role=seller", buyer.id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(promoted["role"], "seller");

    let (status, credited) = app
        .send(
            Method::PUT,
            &format!("/api/admin/users/{}/balance?amount=12.5", buyer.id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(credited["new_balance"], 12.5);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/admin/users/{}", admin.id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/admin/users/{}", buyer.id),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, users) = app.send(Method::GET, "/api/admin/users", Some(&admin_token), None).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_site_settings() {
    let app = TestApp::new();
    let admin = app.seed_user(UserRole::Admin, None).await;
    let admin_token = app.token(&admin);

    let (status, public) = app.send(Method::GET, "/api/settings/public", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(public["site_name"], "GameHub");

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/admin/settings",
            Some(&admin_token),
            Some(json!({ "site_name": "Key Bazaar", "google_analytics_id": "G-123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, saved) = app
        .send(Method::GET, "/api/admin/settings", Some(&admin_token), None)
        .await;
    assert_eq!(saved["site_name"], "Key Bazaar");
    assert_eq!(saved["google_analytics_id"], "G-123");

    let (_, public) = app.send(Method::GET, "/api/settings/public", None, None).await;
    assert_eq!(public["site_name"], "Key Bazaar");
    assert!(public.get("google_analytics_id").is_none());
}
