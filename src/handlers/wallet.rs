//! Wallet HTTP handlers
//!
//! Balance, deposits, withdrawals and the caller's transaction history.

use axum::{
    extract::{Query, State},
    Json,
};
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::models::Pagination;
use crate::state::AppState;
use crate::wallet::{BalanceChange, BalanceResponse, DepositRequest, Transaction, WithdrawalRequest};

/// GET /balance - Current balance of the caller
pub async fn get_balance(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.wallet_service.balance(user.id).await?;
    Ok(Json(BalanceResponse { balance }))
}

/// POST /balance/deposit
pub async fn deposit(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<DepositRequest>,
) -> Result<Json<BalanceChange>, ApiError> {
    req.validate()?;
    Ok(Json(state.wallet_service.deposit(&user, req).await?))
}

/// POST /balance/withdrawal - Deducts now, settled later by an admin
pub async fn withdraw(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(req): Json<WithdrawalRequest>,
) -> Result<Json<BalanceChange>, ApiError> {
    req.validate()?;
    Ok(Json(state.wallet_service.withdraw(&user, req).await?))
}

/// GET /transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(page): Query<Pagination>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    Ok(Json(state.wallet_service.transactions(&user, page).await?))
}
