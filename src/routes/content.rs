//! Giveaway, blog and public settings routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{admin, content};
use crate::state::AppState;

pub fn content_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/giveaways",
            get(content::list_giveaways).post(admin::create_giveaway),
        )
        .route("/giveaways/enter/:id", post(content::enter_giveaway))
        .route("/blog", get(content::list_posts).post(admin::create_post))
        // GET takes a slug; PUT and DELETE take the post id
        .route(
            "/blog/:slug",
            get(content::get_post)
                .put(admin::update_post)
                .delete(admin::delete_post),
        )
        .route("/settings/public", get(content::public_settings))
}
