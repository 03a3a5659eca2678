//! Balance ledger models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

/// One balance movement
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub status: TransactionStatus,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn default_deposit_method() -> String {
    "stripe".to_string()
}

fn default_withdrawal_method() -> String {
    "bank_transfer".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct DepositRequest {
    #[validate(range(min = 0.01, max = 1000000.0, message = "Amount must be positive"))]
    pub amount: f64,
    #[serde(default = "default_deposit_method")]
    pub method: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawalRequest {
    #[validate(range(min = 0.01, max = 1000000.0, message = "Amount must be positive"))]
    pub amount: f64,
    #[serde(default = "default_withdrawal_method")]
    pub method: String,
    #[serde(default)]
    pub account_details: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub balance: f64,
}

/// Outcome of a deposit, withdrawal or admin adjustment
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceChange {
    pub transaction_id: Uuid,
    pub new_balance: f64,
    pub status: TransactionStatus,
}
