//! Giveaway, blog and public settings handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use super::AuthenticatedUser;
use crate::admin::PublicSettings;
use crate::blog::BlogPost;
use crate::error::ApiError;
use crate::giveaway::Giveaway;
use crate::models::Pagination;
use crate::state::AppState;

/// GET /giveaways
pub async fn list_giveaways(
    State(state): State<AppState>,
) -> Result<Json<Vec<Giveaway>>, ApiError> {
    Ok(Json(state.giveaway_service.list().await?))
}

/// POST /giveaways/enter/:id
pub async fn enter_giveaway(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.giveaway_service.enter(id, &user).await?;
    Ok(Json(json!({ "message": outcome.message() })))
}

/// GET /blog
pub async fn list_posts(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<BlogPost>>, ApiError> {
    Ok(Json(state.blog_service.list(page).await?))
}

/// GET /blog/:slug
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, ApiError> {
    Ok(Json(state.blog_service.get_by_slug(&slug).await?))
}

/// GET /settings/public - Storefront settings for anonymous visitors
pub async fn public_settings(
    State(state): State<AppState>,
) -> Result<Json<PublicSettings>, ApiError> {
    let settings = state.admin_service.settings().await?;
    Ok(Json(PublicSettings::from(settings)))
}
