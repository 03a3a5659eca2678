//! Order and payment HTTP handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::orders::{CreateOrderRequest, Order};
use crate::payments::{CheckoutRequest, CheckoutResponse, CheckoutStatusResponse, WebhookAck};
use crate::state::AppState;

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// POST /orders - Create a pending order from catalog products
pub async fn create_order(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
    req.validate()?;
    Ok(Json(state.order_service.create_order(&user, req).await?))
}

/// GET /orders/my - The caller's orders, newest first
pub async fn my_orders(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.order_service.list_for_user(&user).await?))
}

/// GET /orders/:id - Visible to the buyer and admins
pub async fn get_order(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.order_service.get_order(id, &user).await?))
}

/// POST /payments/checkout/session - Open a provider checkout for an order
pub async fn create_checkout_session(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    Ok(Json(
        state
            .payment_service
            .open_checkout(req.order_id, &user)
            .await?,
    ))
}

/// GET /payments/checkout/status/:session_id - Poll and reconcile a checkout
pub async fn checkout_status(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(session_id): Path<String>,
) -> Result<Json<CheckoutStatusResponse>, ApiError> {
    Ok(Json(
        state
            .payment_service
            .get_status(&session_id, &user)
            .await?,
    ))
}

/// POST /webhook/stripe - Provider notification, authenticated by signature
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state
        .payment_service
        .handle_webhook(&body, signature)
        .await?;
    tracing::debug!(outcome = ?outcome, "Payment webhook processed");

    Ok(Json(WebhookAck::success()))
}
