//! Stripe Checkout client
//!
//! Sessions are created with the form-encoded REST API. Webhooks carry a
//! `Stripe-Signature: t=<unix>,v1=<hex>` header signing `"<t>.<body>"`
//! with HMAC-SHA256 under the endpoint secret.

use axum::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, Response};
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;

use super::provider::{
    NewCheckoutSession, PaymentProvider, ProviderError, ProviderPaymentStatus, ProviderSession,
    ProviderSessionStatus, WebhookEvent,
};

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a webhook signature timestamp
const WEBHOOK_TOLERANCE_SECONDS: i64 = 300;

const PAID_EVENTS: &[&str] = &[
    "checkout.session.completed",
    "checkout.session.async_payment_succeeded",
];

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    webhook_secret: Option<String>,
}

#[derive(Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct StripeSession {
    #[serde(default)]
    status: Option<String>,
    payment_status: ProviderPaymentStatus,
    #[serde(default)]
    amount_total: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Deserialize)]
struct StripeEventData {
    object: StripeEventObject,
}

#[derive(Deserialize)]
struct StripeEventObject {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    payment_status: Option<String>,
}

impl StripeClient {
    pub fn new(
        api_url: &str,
        api_key: Option<String>,
        webhook_secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            webhook_secret,
        })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::NotConfigured)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<StripeErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error.message)
                .unwrap_or_else(|| "request failed".to_string());
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }
}

fn webhook_mac(secret: &str) -> Result<HmacSha256, ProviderError> {
    HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ProviderError::Malformed(e.to_string()))
}

/// Build a `Stripe-Signature` header value for `payload` signed at `timestamp`
pub fn sign_webhook_payload(
    payload: &[u8],
    secret: &str,
    timestamp: i64,
) -> Result<String, ProviderError> {
    let mut mac = webhook_mac(secret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check a `Stripe-Signature` header against the raw payload
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), ProviderError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(ProviderError::InvalidSignature)?;
    if (now - timestamp).abs() > WEBHOOK_TOLERANCE_SECONDS {
        return Err(ProviderError::InvalidSignature);
    }

    let valid = signatures.iter().any(|signature| {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = webhook_mac(secret) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    });

    if valid {
        Ok(())
    } else {
        Err(ProviderError::InvalidSignature)
    }
}

/// Decode a verified event body
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent, ProviderError> {
    let event: StripeEvent =
        serde_json::from_slice(payload).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let paid = event.data.object.payment_status.as_deref() == Some("paid");
    match (PAID_EVENTS.contains(&event.event_type.as_str()), paid, event.data.object.id) {
        (true, true, Some(session_id)) => Ok(WebhookEvent::CheckoutPaid { session_id }),
        (true, true, None) => Err(ProviderError::Malformed(
            "checkout event without session id".to_string(),
        )),
        _ => Ok(WebhookEvent::Ignored {
            event_type: event.event_type,
        }),
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<ProviderSession, ProviderError> {
        let api_key = self.api_key()?;

        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), session.success_url),
            ("cancel_url".into(), session.cancel_url),
            ("line_items[0][quantity]".into(), "1".into()),
            ("line_items[0][price_data][currency]".into(), session.currency),
            (
                "line_items[0][price_data][unit_amount]".into(),
                session.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                session.description,
            ),
        ];
        if let Some(order_id) = session.metadata.get("order_id") {
            form.push(("client_reference_id".into(), order_id.clone()));
        }
        for (key, value) in session.metadata {
            form.push((format!("metadata[{}]", key), value));
        }

        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_url))
            .bearer_auth(api_key)
            .form(&form)
            .send()
            .await?;

        Self::read_json::<ProviderSession>(response).await
    }

    async fn get_checkout_status(
        &self,
        session_id: &str,
    ) -> Result<ProviderSessionStatus, ProviderError> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(format!("{}/v1/checkout/sessions/{}", self.api_url, session_id))
            .bearer_auth(api_key)
            .send()
            .await?;

        let session = Self::read_json::<StripeSession>(response).await?;
        Ok(ProviderSessionStatus {
            status: session.status.unwrap_or_else(|| "open".to_string()),
            payment_status: session.payment_status,
            amount_total: session.amount_total.unwrap_or(0),
            currency: session.currency.unwrap_or_default(),
        })
    }

    fn parse_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookEvent, ProviderError> {
        // Fail closed when no secret is configured
        let secret = self
            .webhook_secret
            .as_deref()
            .ok_or(ProviderError::NotConfigured)?;
        let header = signature.ok_or(ProviderError::InvalidSignature)?;

        verify_webhook_signature(body, header, secret, Utc::now().timestamp())?;
        parse_event(body)
    }
}
