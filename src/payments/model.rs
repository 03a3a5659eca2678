//! Payment session models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored payment state of a checkout session
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionPaymentStatus {
    Pending,
    Paid,
}

/// Stored lifecycle of a checkout session
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Initiated,
    Completed,
}

/// One checkout attempt for an order
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentSession {
    pub id: Uuid,
    /// Provider-issued session id
    pub session_id: String,
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub payment_status: SessionPaymentStatus,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub url: String,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutStatusResponse {
    pub status: String,
    pub payment_status: String,
    /// Minor units, as reported by the provider
    pub amount_total: i64,
    pub currency: String,
}

/// What a call to the reconciler did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This call moved the session and the order to paid and ran the side effects
    Applied {
        order_id: Uuid,
        /// Products whose stock could not cover the order under `reject_oversell`
        oversold: Vec<Uuid>,
    },
    /// The session was already marked paid by an earlier call
    AlreadyApplied,
    /// Session marked paid, but the order had left `pending` through another path
    OrderNotPending { order_id: Uuid },
    /// The provider does not report the session as paid
    NotPaid,
    /// No session with this id exists
    UnknownSession,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: String,
}

impl WebhookAck {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}
