//! User balance and transaction ledger

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{round_money, Pagination, User};
use crate::store::{collections, DocumentStore, Filter, Update};
use crate::wallet::{
    BalanceChange, DepositRequest, Transaction, TransactionStatus, TransactionType,
    WithdrawalRequest,
};

pub struct WalletService {
    store: Arc<dyn DocumentStore>,
}

impl WalletService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Current balance read from the store, not from the session snapshot
    pub async fn balance(&self, user_id: Uuid) -> ApiResult<f64> {
        let user: User = self
            .store
            .find_record(collections::USERS, &Filter::by_id(user_id))
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
        Ok(round_money(user.balance))
    }

    async fn record(
        &self,
        user_id: Uuid,
        amount: f64,
        kind: TransactionType,
        status: TransactionStatus,
        method: String,
        description: String,
    ) -> ApiResult<Transaction> {
        let transaction = Transaction {
            id: Uuid::new_v4(),
            user_id,
            amount: round_money(amount),
            kind,
            status,
            method: Some(method),
            description: Some(description),
            created_at: Utc::now(),
        };
        self.store
            .insert_record(collections::TRANSACTIONS, &transaction)
            .await?;
        Ok(transaction)
    }

    /// Add `delta` to the balance if the result stays non-negative; returns the new balance
    async fn apply_delta(&self, user_id: Uuid, delta: f64) -> ApiResult<Option<f64>> {
        let mut filter = Filter::by_id(user_id);
        if delta < 0.0 {
            filter = filter.gte("balance", -delta);
        }
        let updated: Option<User> = self
            .store
            .find_record_and_update(
                collections::USERS,
                &filter,
                &Update::new().inc("balance", delta),
            )
            .await?;
        Ok(updated.map(|u| round_money(u.balance)))
    }

    async fn user_exists(&self, user_id: Uuid) -> ApiResult<bool> {
        Ok(self
            .store
            .count(collections::USERS, &Filter::by_id(user_id))
            .await?
            > 0)
    }

    pub async fn deposit(&self, user: &User, request: DepositRequest) -> ApiResult<BalanceChange> {
        let amount = round_money(request.amount);
        let new_balance = self
            .apply_delta(user.id, amount)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        let transaction = self
            .record(
                user.id,
                amount,
                TransactionType::Deposit,
                TransactionStatus::Completed,
                request.method.clone(),
                format!("Deposit via {}", request.method),
            )
            .await?;

        tracing::info!(user_id = %user.id, transaction_id = %transaction.id, amount, "Balance deposit");
        Ok(BalanceChange {
            transaction_id: transaction.id,
            new_balance,
            status: transaction.status,
        })
    }

    /// Deducts immediately; the withdrawal stays pending until an admin settles it
    pub async fn withdraw(&self, user: &User, request: WithdrawalRequest) -> ApiResult<BalanceChange> {
        let amount = round_money(request.amount);
        let Some(new_balance) = self.apply_delta(user.id, -amount).await? else {
            if !self.user_exists(user.id).await? {
                return Err(ApiError::NotFound("User not found".to_string()));
            }
            return Err(ApiError::InvalidState("Insufficient balance".to_string()));
        };

        let transaction = self
            .record(
                user.id,
                amount,
                TransactionType::Withdrawal,
                TransactionStatus::Pending,
                request.method.clone(),
                format!("Withdrawal via {}", request.method),
            )
            .await?;

        tracing::info!(user_id = %user.id, transaction_id = %transaction.id, amount, "Withdrawal requested");
        Ok(BalanceChange {
            transaction_id: transaction.id,
            new_balance,
            status: transaction.status,
        })
    }

    pub async fn transactions(&self, user: &User, page: Pagination) -> ApiResult<Vec<Transaction>> {
        Ok(self
            .store
            .find_records(
                collections::TRANSACTIONS,
                &Filter::new().eq("user_id", user.id),
                &page.newest_first("created_at"),
            )
            .await?)
    }

    // ------------------------------------------------------------------
    // Admin
    // ------------------------------------------------------------------

    /// Credit or debit a user's balance. The balance never goes negative.
    pub async fn adjust_balance(
        &self,
        admin: &User,
        user_id: Uuid,
        amount: f64,
    ) -> ApiResult<BalanceChange> {
        let amount = round_money(amount);
        if amount == 0.0 {
            return Err(ApiError::BadRequest("Amount must be non-zero".to_string()));
        }

        let Some(new_balance) = self.apply_delta(user_id, amount).await? else {
            if !self.user_exists(user_id).await? {
                return Err(ApiError::NotFound("User not found".to_string()));
            }
            return Err(ApiError::InvalidState(
                "Balance cannot be negative".to_string(),
            ));
        };

        let kind = if amount > 0.0 {
            TransactionType::Deposit
        } else {
            TransactionType::Withdrawal
        };
        let transaction = self
            .record(
                user_id,
                amount.abs(),
                kind,
                TransactionStatus::Completed,
                "admin_adjustment".to_string(),
                format!("Admin adjustment by {}", admin.id),
            )
            .await?;

        tracing::info!(
            user_id = %user_id,
            admin_id = %admin.id,
            amount,
            "Balance adjusted by admin"
        );
        Ok(BalanceChange {
            transaction_id: transaction.id,
            new_balance,
            status: transaction.status,
        })
    }

    pub async fn list_all(&self, page: Pagination) -> ApiResult<Vec<Transaction>> {
        Ok(self
            .store
            .find_records(
                collections::TRANSACTIONS,
                &Filter::new(),
                &page.newest_first("created_at"),
            )
            .await?)
    }

    pub async fn set_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> ApiResult<Transaction> {
        self.store
            .find_record_and_update(
                collections::TRANSACTIONS,
                &Filter::by_id(transaction_id),
                &Update::new().set("status", status),
            )
            .await?
            .ok_or_else(|| ApiError::NotFound("Transaction not found".to_string()))
    }
}
