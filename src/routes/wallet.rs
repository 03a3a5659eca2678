//! Wallet routes

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::wallet;
use crate::state::AppState;

pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/balance", get(wallet::get_balance))
        .route("/balance/deposit", post(wallet::deposit))
        .route("/balance/withdrawal", post(wallet::withdraw))
        .route("/transactions", get(wallet::list_transactions))
}
