//! Payment provider abstraction

use axum::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::error::ApiError;

/// Payment state as reported by the provider
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProviderPaymentStatus {
    Unpaid,
    Paid,
    NoPaymentRequired,
}

impl ProviderPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderPaymentStatus::Unpaid => "unpaid",
            ProviderPaymentStatus::Paid => "paid",
            ProviderPaymentStatus::NoPaymentRequired => "no_payment_required",
        }
    }
}

/// Checkout session to open with the provider
#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    /// Amount in the currency's minor unit
    pub amount_minor: i64,
    pub currency: String,
    pub description: String,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
}

/// Opened checkout session
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSession {
    pub id: String,
    pub url: String,
}

/// Provider view of a checkout session
#[derive(Debug, Clone)]
pub struct ProviderSessionStatus {
    /// `open`, `complete` or `expired`
    pub status: String,
    pub payment_status: ProviderPaymentStatus,
    pub amount_total: i64,
    pub currency: String,
}

/// Verified webhook notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// A checkout session finished with a successful payment
    CheckoutPaid { session_id: String },
    /// Anything the reconciler does not act on
    Ignored { event_type: String },
}

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Payment provider is not configured")]
    NotConfigured,

    #[error("Payment provider request timed out")]
    Timeout,

    #[error("Payment provider transport error: {0}")]
    Transport(String),

    #[error("Payment provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid webhook signature")]
    InvalidSignature,

    #[error("Malformed provider payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Transport(e.to_string())
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured => ApiError::Misconfigured(err.to_string()),
            ProviderError::Timeout => {
                ApiError::ServiceUnavailable("Payment provider timed out, retry later".to_string())
            }
            ProviderError::Transport(_) | ProviderError::Api { .. } => {
                ApiError::Upstream(err.to_string())
            }
            ProviderError::InvalidSignature | ProviderError::Malformed(_) => {
                ApiError::BadRequest(err.to_string())
            }
        }
    }
}

/// External payment provider
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<ProviderSession, ProviderError>;

    async fn get_checkout_status(&self, session_id: &str)
        -> Result<ProviderSessionStatus, ProviderError>;

    /// Verify the signature over the raw body and decode the event
    fn parse_webhook(&self, body: &[u8], signature: Option<&str>)
        -> Result<WebhookEvent, ProviderError>;
}

/// Currencies without a minor unit
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "bif", "clp", "djf", "gnf", "jpy", "kmf", "krw", "mga", "pyg", "rwf", "ugx", "vnd", "vuv",
    "xaf", "xof", "xpf",
];

/// Convert a decimal amount to the provider's integer minor units
pub fn to_minor_units(amount: f64, currency: &str) -> i64 {
    if ZERO_DECIMAL_CURRENCIES.contains(&currency.to_lowercase().as_str()) {
        amount.round() as i64
    } else {
        (amount * 100.0).round() as i64
    }
}
