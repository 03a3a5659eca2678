//! Admin routes

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers::admin;
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(admin::stats))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/:id", axum::routing::delete(admin::delete_user))
        .route("/admin/users/:id/role", put(admin::set_user_role))
        .route("/admin/users/:id/balance", put(admin::adjust_user_balance))
        .route("/admin/products", get(admin::list_products))
        .route("/admin/orders", get(admin::list_orders))
        .route("/admin/orders/:id/status", put(admin::set_order_status))
        .route("/admin/transactions", get(admin::list_transactions))
        .route(
            "/admin/transactions/:id/status",
            put(admin::set_transaction_status),
        )
        .route(
            "/admin/giveaways",
            get(admin::list_giveaways).post(admin::create_giveaway),
        )
        .route(
            "/admin/giveaways/:id",
            put(admin::update_giveaway).delete(admin::delete_giveaway),
        )
        .route("/admin/blog", get(admin::list_posts).post(admin::create_post))
        .route(
            "/admin/blog/:id",
            put(admin::update_post).delete(admin::delete_post),
        )
        .route(
            "/admin/settings",
            get(admin::get_settings).put(admin::save_settings),
        )
}
