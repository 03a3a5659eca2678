//! Catalog routes

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::catalog;
use crate::state::AppState;

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route(
            "/products/:id",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route("/products/:id/similar", get(catalog::similar_products))
        .route("/sellers/:id", get(catalog::get_seller))
        .route("/sellers/:id/products", get(catalog::seller_products))
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/categories/:id",
            get(catalog::get_category)
                .put(catalog::update_category)
                .delete(catalog::delete_category),
        )
        .route("/favorites", post(catalog::add_favorite))
        .route("/favorites/my", get(catalog::my_favorites))
        .route("/favorites/:product_id", delete(catalog::remove_favorite))
        .route("/viewed/my", get(catalog::my_viewed))
        .route("/viewed/:product_id", post(catalog::record_view))
}
