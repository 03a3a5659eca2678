//! Admin panel HTTP handlers
//!
//! Every handler here requires the admin role through [`AdminUser`].

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::AdminUser;
use crate::admin::{
    AdminStats, BalanceAdjustment, RoleChange, SiteSettings, TransactionStatusChange,
};
use crate::blog::{BlogPost, BlogPostRequest};
use crate::catalog::{Product, ProductQuery};
use crate::error::ApiError;
use crate::giveaway::{Giveaway, GiveawayRequest};
use crate::models::{Pagination, UserResponse};
use crate::orders::{Order, OrderListQuery, OrderStatusUpdate};
use crate::state::AppState;
use crate::wallet::{BalanceChange, Transaction};

/// GET /admin/stats
pub async fn stats(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.admin_service.stats().await?))
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    Ok(Json(state.admin_service.list_users(page).await?))
}

/// PUT /admin/users/:id/role?role=
pub async fn set_user_role(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Query(change): Query<RoleChange>,
) -> Result<Json<UserResponse>, ApiError> {
    Ok(Json(state.admin_service.set_role(id, change.role).await?))
}

/// PUT /admin/users/:id/balance?amount= - Positive credits, negative debits
pub async fn adjust_user_balance(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Query(adjustment): Query<BalanceAdjustment>,
) -> Result<Json<BalanceChange>, ApiError> {
    Ok(Json(
        state
            .wallet_service
            .adjust_balance(&admin, id, adjustment.amount)
            .await?,
    ))
}

/// DELETE /admin/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.admin_service.delete_user(&admin, id).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

/// GET /admin/products
pub async fn list_products(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog_service.list_products(&query).await?))
}

/// GET /admin/orders?status=
pub async fn list_orders(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>, ApiError> {
    Ok(Json(state.order_service.list_all(&query).await?))
}

/// PUT /admin/orders/:id/status?status=
pub async fn set_order_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Query(update): Query<OrderStatusUpdate>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(
        state.order_service.update_status(id, update.status).await?,
    ))
}

/// GET /admin/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(state.wallet_service.list_all(page).await?))
}

/// PUT /admin/transactions/:id/status?status=
pub async fn set_transaction_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Query(change): Query<TransactionStatusChange>,
) -> Result<Json<Transaction>, ApiError> {
    let transaction = state.wallet_service.set_status(id, change.status).await?;
    tracing::info!(
        transaction_id = %id,
        admin_id = %admin.id,
        status = change.status.as_str(),
        "Transaction status updated"
    );
    Ok(Json(transaction))
}

/// GET /admin/giveaways
pub async fn list_giveaways(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<Giveaway>>, ApiError> {
    Ok(Json(state.giveaway_service.list().await?))
}

/// POST /admin/giveaways (also POST /giveaways)
pub async fn create_giveaway(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<GiveawayRequest>,
) -> Result<Json<Giveaway>, ApiError> {
    req.validate()?;
    Ok(Json(state.giveaway_service.create(req).await?))
}

/// PUT /admin/giveaways/:id
pub async fn update_giveaway(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<GiveawayRequest>,
) -> Result<Json<Giveaway>, ApiError> {
    req.validate()?;
    Ok(Json(state.giveaway_service.update(id, req).await?))
}

/// DELETE /admin/giveaways/:id
pub async fn delete_giveaway(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.giveaway_service.delete(id).await?;
    Ok(Json(json!({ "message": "Giveaway deleted successfully" })))
}

/// GET /admin/blog
pub async fn list_posts(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    Ok(Json(state.blog_service.list_all().await?))
}

/// POST /admin/blog (also POST /blog)
pub async fn create_post(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(req): Json<BlogPostRequest>,
) -> Result<Json<BlogPost>, ApiError> {
    req.validate()?;
    Ok(Json(state.blog_service.create(&admin, req).await?))
}

/// PUT /admin/blog/:id (also PUT /blog/:id)
pub async fn update_post(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<BlogPostRequest>,
) -> Result<Json<BlogPost>, ApiError> {
    req.validate()?;
    Ok(Json(state.blog_service.update(id, req).await?))
}

/// DELETE /admin/blog/:id (also DELETE /blog/:id)
pub async fn delete_post(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.blog_service.delete(id).await?;
    Ok(Json(json!({ "message": "Blog post deleted" })))
}

/// GET /admin/settings
pub async fn get_settings(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<SiteSettings>, ApiError> {
    Ok(Json(state.admin_service.settings().await?))
}

/// PUT /admin/settings
pub async fn save_settings(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(settings): Json<SiteSettings>,
) -> Result<Json<SiteSettings>, ApiError> {
    Ok(Json(state.admin_service.save_settings(settings).await?))
}
