//! Password accounts, Telegram widget login and linking, and bot tokens

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tokio::task::JoinSet;

use common::{TestApp, BOT_TOKEN};
use gamehub_server::auth::{sign_payload, sign_widget_fields, AuthError};
use gamehub_server::models::{TokenPurpose, UserRole};

/// Widget payload signed with the test bot token
fn widget_payload(telegram_id: i64, username: &str, auth_date: i64) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("id".to_string(), telegram_id.to_string());
    fields.insert("first_name".to_string(), "Ann".to_string());
    fields.insert("username".to_string(), username.to_string());
    fields.insert("auth_date".to_string(), auth_date.to_string());
    let hash = sign_widget_fields(&fields, BOT_TOKEN).unwrap();

    json!({
        "id": telegram_id,
        "first_name": "Ann",
        "username": username,
        "auth_date": auth_date,
        "hash": hash,
    })
}

async fn bot_request(app: &TestApp, uri: &str, body: Value, signed: bool) -> (StatusCode, Value) {
    let body = body.to_string();
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if signed {
        builder = builder.header(
            "x-bot-signature",
            sign_payload(body.as_bytes(), BOT_TOKEN).unwrap(),
        );
    }
    app.call(builder.body(Body::from(body)).unwrap()).await
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new();

    let (status, registered) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "Player@Example.com",
                "password": "secret-pass",
                "full_name": "Player One",
                "role": "seller"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(registered["token_type"], "bearer");
    assert_eq!(registered["user"]["email"], "player@example.com");
    assert_eq!(registered["user"]["role"], "seller");
    assert_eq!(registered["user"]["has_password"], true);
    assert!(registered["user"].get("password_hash").is_none());

    let (status, logged_in) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "player@example.com", "password": "secret-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = logged_in["access_token"].as_str().unwrap();

    let (status, me) = app.send(Method::GET, "/api/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["full_name"], "Player One");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "player@example.com", "password": "wrong-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(Method::GET, "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.send(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_admin_role() {
    let app = TestApp::new();
    let body = json!({ "email": "dup@example.com", "password": "secret-pass", "full_name": "Dup" });

    let (status, _) = app
        .send(Method::POST, "/api/auth/register", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, error) = app
        .send(Method::POST, "/api/auth/register", None, Some(body))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "CONFLICT");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "boss@example.com",
                "password": "secret-pass",
                "full_name": "Boss",
                "role": "admin"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, error) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "secret-pass", "full_name": "X" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_widget_login_creates_then_reuses_account() {
    let app = TestApp::new();
    let now = Utc::now().timestamp();

    let (status, first) = app
        .send(
            Method::POST,
            "/api/auth/telegram/widget",
            None,
            Some(widget_payload(42, "ann", now)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["user"]["telegram_id"], 42);
    assert_eq!(first["user"]["telegram_username"], "ann");
    assert_eq!(first["user"]["has_password"], false);

    let (status, second) = app
        .send(
            Method::POST,
            "/api/auth/widget/login",
            None,
            Some(widget_payload(42, "ann_renamed", now)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["user"]["id"], first["user"]["id"]);
    assert_eq!(second["user"]["telegram_username"], "ann_renamed");
}

#[tokio::test]
async fn test_widget_login_rejects_bad_or_stale_payloads() {
    let app = TestApp::new();
    let now = Utc::now().timestamp();

    let mut tampered = widget_payload(42, "ann", now);
    tampered["id"] = json!(43);
    let (status, _) = app
        .send(Method::POST, "/api/auth/telegram/widget", None, Some(tampered))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let stale = widget_payload(42, "ann", now - 2 * 24 * 3600);
    let (status, _) = app
        .send(Method::POST, "/api/auth/telegram/widget", None, Some(stale))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_link_and_unlink_telegram() {
    let app = TestApp::new();
    let now = Utc::now().timestamp();

    let (_, registered) = app
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "link@example.com", "password": "secret-pass", "full_name": "Link" })),
        )
        .await;
    let token = registered["access_token"].as_str().unwrap().to_string();

    // Nothing linked yet
    let (status, error) = app
        .send(Method::POST, "/api/auth/telegram/unlink", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "INVALID_STATE");

    let (status, linked) = app
        .send(
            Method::POST,
            "/api/auth/telegram/link",
            Some(&token),
            Some(widget_payload(777, "linker", now)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(linked["telegram_id"], 777);

    // Another account cannot claim the same Telegram identity
    let other = app.seed_user(UserRole::Buyer, None).await;
    let (status, error) = app
        .send(
            Method::POST,
            "/api/auth/widget/link",
            Some(&app.token(&other)),
            Some(widget_payload(777, "linker", now)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "CONFLICT");

    let (status, unlinked) = app
        .send(Method::POST, "/api/auth/widget/unlink", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(unlinked["telegram_id"].is_null());
    assert!(unlinked["telegram_username"].is_null());
}

#[tokio::test]
async fn test_unlink_requires_password() {
    let app = TestApp::new();
    let now = Utc::now().timestamp();

    let (_, session) = app
        .send(
            Method::POST,
            "/api/auth/telegram/widget",
            None,
            Some(widget_payload(99, "tgonly", now)),
        )
        .await;
    let token = session["access_token"].as_str().unwrap().to_string();

    let (status, error) = app
        .send(Method::POST, "/api/auth/telegram/unlink", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"]["code"], "INVALID_STATE");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/password",
            Some(&token),
            Some(json!({ "new_password": "fresh-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, unlinked) = app
        .send(Method::POST, "/api/auth/telegram/unlink", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(unlinked["telegram_id"].is_null());
    assert_eq!(unlinked["has_password"], true);
}

#[tokio::test]
async fn test_widget_login_after_unlink_creates_fresh_account() {
    let app = TestApp::new();
    let now = Utc::now().timestamp();

    let (_, first) = app
        .send(
            Method::POST,
            "/api/auth/telegram/widget",
            None,
            Some(widget_payload(77, "returning", now)),
        )
        .await;
    let token = first["access_token"].as_str().unwrap().to_string();
    assert_eq!(first["user"]["email"], "tg_77@telegram.user");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/auth/password",
            Some(&token),
            Some(json!({ "new_password": "fresh-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .send(Method::POST, "/api/auth/telegram/unlink", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, second) = app
        .send(
            Method::POST,
            "/api/auth/telegram/widget",
            None,
            Some(widget_payload(77, "returning", now)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(second["user"]["id"], first["user"]["id"]);
    assert_eq!(second["user"]["telegram_id"], 77);
    assert_ne!(second["user"]["email"], "tg_77@telegram.user");

    let (status, again) = app
        .send(
            Method::POST,
            "/api/auth/telegram/widget",
            None,
            Some(widget_payload(77, "returning", now)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["user"]["id"], second["user"]["id"]);
}

#[tokio::test]
async fn test_bot_login_token_round_trip() {
    let app = TestApp::new();
    let user = app.seed_user(UserRole::Buyer, Some(5150)).await;

    let (status, _) = bot_request(
        &app,
        "/api/bot/login-token",
        json!({ "telegram_id": 5150 }),
        false,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, issued) = bot_request(
        &app,
        "/api/bot/login-token",
        json!({ "telegram_id": 5150 }),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let login_token = issued["token"].as_str().unwrap().to_string();
    let uri = format!("/api/auth/telegram/bot-token?token={}", login_token);

    let (status, session) = app.send(Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["user"]["id"], user.id.to_string());

    // One-time: the second exchange fails
    let (status, _) = app.send(Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = bot_request(
        &app,
        "/api/bot/login-token",
        json!({ "telegram_id": 6060 }),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_one_time_token_redeemed_once_under_contention() {
    let app = TestApp::new();
    let user = app.seed_user(UserRole::Buyer, Some(8080)).await;
    let auth = Arc::clone(&app.state.auth_service);

    let issued = auth
        .issue_one_time_token(user.id, TokenPurpose::BotLogin, Duration::minutes(5))
        .await
        .unwrap();

    let mut attempts = JoinSet::new();
    for _ in 0..10 {
        let auth = Arc::clone(&auth);
        let token = issued.token.clone();
        attempts.spawn(async move { auth.login_with_bot_token(&token).await });
    }

    let mut sessions = 0;
    while let Some(result) = attempts.join_next().await {
        match result.unwrap() {
            Ok(_) => sessions += 1,
            Err(e) => assert!(matches!(e, AuthError::OneTimeTokenNotFound)),
        }
    }
    assert_eq!(sessions, 1);
}

#[tokio::test]
async fn test_expired_one_time_token_is_rejected() {
    let app = TestApp::new();
    let user = app.seed_user(UserRole::Buyer, None).await;

    let issued = app
        .state
        .auth_service
        .issue_one_time_token(user.id, TokenPurpose::BotLogin, Duration::seconds(-1))
        .await
        .unwrap();

    let result = app.state.auth_service.login_with_bot_token(&issued.token).await;
    assert!(matches!(result, Err(AuthError::OneTimeTokenExpired)));
}

#[tokio::test]
async fn test_link_code_redeemed_by_bot() {
    let app = TestApp::new();
    let user = app.seed_user(UserRole::Seller, None).await;

    let (status, issued) = app
        .send(
            Method::POST,
            "/api/auth/telegram/link-code",
            Some(&app.token(&user)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let code = issued["code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 8);

    let (status, linked) = bot_request(
        &app,
        "/api/bot/link",
        json!({ "code": code.to_lowercase(), "telegram_id": 3030, "username": "seller_bot" }),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(linked["id"], user.id.to_string());
    assert_eq!(linked["telegram_id"], 3030);

    let (status, _) = bot_request(
        &app,
        "/api/bot/link",
        json!({ "code": code, "telegram_id": 3031 }),
        true,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
