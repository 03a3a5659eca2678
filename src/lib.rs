//! GameHub Backend Library
//!
//! Marketplace API for digital game goods: catalog, orders with Stripe
//! checkout, Telegram login and notifications, chat, giveaways, blog,
//! internal balance and the admin panel.

pub mod admin;
pub mod auth;
pub mod blog;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod giveaway;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod orders;
pub mod payments;
pub mod routes;
pub mod state;
pub mod store;
pub mod wallet;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
};

use config::Config;
use state::AppState;

/// Build the application router
pub fn build_router(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api", routes::api_routes())
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(configure_cors(config.cors_origins.as_deref()))
}

async fn root() -> &'static str {
    "GameHub API Server"
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    version: String,
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let (status, database) = match state.store.ping().await {
        Ok(()) => ("healthy", "connected".to_string()),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            ("unhealthy", "unavailable".to_string())
        }
    };

    Json(HealthResponse {
        status: status.to_string(),
        database,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "*")
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
