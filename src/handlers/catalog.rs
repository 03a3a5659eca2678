//! Catalog HTTP handlers
//!
//! Products, categories, seller storefronts, favorites and recently viewed.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{AdminUser, AuthenticatedUser};
use crate::catalog::{
    Category, CategoryQuery, CategoryRequest, FavoriteRequest, Product, ProductQuery,
    ProductRequest, ProductUpdate,
};
use crate::error::ApiError;
use crate::models::{Pagination, SellerProfile};
use crate::state::AppState;

/// GET /products - List products
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog_service.list_products(&query).await?))
}

/// GET /products/:id - Get a product and count the view
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(state.catalog_service.get_product(id).await?))
}

/// POST /products - List a product for sale as the caller
pub async fn create_product(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<ProductRequest>,
) -> Result<Json<Product>, ApiError> {
    req.validate()?;
    Ok(Json(state.catalog_service.create_product(&user, req).await?))
}

/// PUT /products/:id - Update a product (owner or admin)
pub async fn update_product(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ProductUpdate>,
) -> Result<Json<Product>, ApiError> {
    req.validate()?;
    Ok(Json(
        state.catalog_service.update_product(&user, id, req).await?,
    ))
}

/// DELETE /products/:id - Delete a product (owner or admin)
pub async fn delete_product(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.catalog_service.delete_product(&user, id).await?;
    Ok(Json(json!({ "message": "Product deleted" })))
}

/// GET /products/:id/similar
pub async fn similar_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog_service.similar_products(id).await?))
}

/// GET /sellers/:id
pub async fn get_seller(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SellerProfile>, ApiError> {
    Ok(Json(state.catalog_service.seller_profile(id).await?))
}

/// GET /sellers/:id/products
pub async fn seller_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog_service.seller_products(id, page).await?))
}

/// GET /categories
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.catalog_service.list_categories(&query).await?))
}

/// GET /categories/:id
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.catalog_service.get_category(id).await?))
}

/// POST /categories - Admin only
pub async fn create_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    req.validate()?;
    Ok(Json(state.catalog_service.create_category(req).await?))
}

/// PUT /categories/:id - Admin only
pub async fn update_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    req.validate()?;
    Ok(Json(state.catalog_service.update_category(id, req).await?))
}

/// DELETE /categories/:id - Admin only, refused while in use
pub async fn delete_category(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.catalog_service.delete_category(id).await?;
    Ok(Json(json!({ "message": "Category deleted" })))
}

/// POST /favorites?product_id=
pub async fn add_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(req): Query<FavoriteRequest>,
) -> Result<Json<Value>, ApiError> {
    state
        .catalog_service
        .add_favorite(&user, req.product_id)
        .await?;
    Ok(Json(json!({ "message": "Added to favorites" })))
}

/// DELETE /favorites/:product_id
pub async fn remove_favorite(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state
        .catalog_service
        .remove_favorite(&user, product_id)
        .await?;
    Ok(Json(json!({ "message": "Removed from favorites" })))
}

/// GET /favorites/my
pub async fn my_favorites(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog_service.list_favorites(&user).await?))
}

/// POST /viewed/:product_id
pub async fn record_view(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    state.catalog_service.record_view(&user, product_id).await?;
    Ok(Json(json!({ "message": "Added to viewed" })))
}

/// GET /viewed/my
pub async fn my_viewed(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.catalog_service.list_viewed(&user).await?))
}
