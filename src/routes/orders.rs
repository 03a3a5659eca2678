//! Order and payment routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::orders;
use crate::state::AppState;

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(orders::create_order))
        .route("/orders/my", get(orders::my_orders))
        .route("/orders/:id", get(orders::get_order))
        .route(
            "/payments/checkout/session",
            post(orders::create_checkout_session),
        )
        .route(
            "/payments/checkout/status/:session_id",
            get(orders::checkout_status),
        )
        .route("/webhook/stripe", post(orders::payment_webhook))
        .route("/webhook/payment-provider", post(orders::payment_webhook))
}
