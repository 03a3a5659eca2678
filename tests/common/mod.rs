//! Shared helpers for the HTTP integration tests
//!
//! Every test runs the full router over an in-memory store, with a scripted
//! payment provider and a notifier that records what it was asked to send.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use gamehub_server::build_router;
use gamehub_server::catalog::Product;
use gamehub_server::config::{Config, StockPolicy, StoreBackend};
use gamehub_server::models::{User, UserRole};
use gamehub_server::notify::Notifier;
use gamehub_server::payments::stripe::{parse_event, sign_webhook_payload, verify_webhook_signature};
use gamehub_server::payments::{
    NewCheckoutSession, PaymentProvider, ProviderError, ProviderPaymentStatus, ProviderSession,
    ProviderSessionStatus, WebhookEvent,
};
use gamehub_server::state::AppState;
use gamehub_server::store::{
    collections, DocumentStore, Filter, FindOptions, MemoryStore, StoreError, Update,
};

pub const BOT_TOKEN: &str = "123456:TEST-TOKEN";
pub const WEBHOOK_SECRET: &str = "whsec_test";

/// Provider double: sessions stay unpaid until the test marks them paid
#[derive(Default)]
pub struct MockProvider {
    sessions: Mutex<HashMap<String, (i64, String, ProviderPaymentStatus)>>,
    opened: Mutex<Vec<NewCheckoutSession>>,
}

impl MockProvider {
    pub fn set_paid(&self, session_id: &str) {
        if let Some(entry) = self.sessions.lock().unwrap().get_mut(session_id) {
            entry.2 = ProviderPaymentStatus::Paid;
        }
    }

    pub fn opened(&self) -> Vec<NewCheckoutSession> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_checkout_session(
        &self,
        session: NewCheckoutSession,
    ) -> Result<ProviderSession, ProviderError> {
        let mut sessions = self.sessions.lock().unwrap();
        let id = format!("cs_test_{}", sessions.len() + 1);
        sessions.insert(
            id.clone(),
            (
                session.amount_minor,
                session.currency.clone(),
                ProviderPaymentStatus::Unpaid,
            ),
        );
        self.opened.lock().unwrap().push(session);

        Ok(ProviderSession {
            url: format!("https://checkout.test/{}", id),
            id,
        })
    }

    async fn get_checkout_status(
        &self,
        session_id: &str,
    ) -> Result<ProviderSessionStatus, ProviderError> {
        let sessions = self.sessions.lock().unwrap();
        let (amount_total, currency, payment_status) = sessions.get(session_id).cloned().ok_or(
            ProviderError::Api {
                status: 404,
                message: "No such checkout session".to_string(),
            },
        )?;

        Ok(ProviderSessionStatus {
            status: if payment_status == ProviderPaymentStatus::Paid {
                "complete".to_string()
            } else {
                "open".to_string()
            },
            payment_status,
            amount_total,
            currency,
        })
    }

    fn parse_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookEvent, ProviderError> {
        let signature = signature.ok_or(ProviderError::InvalidSignature)?;
        verify_webhook_signature(body, signature, WEBHOOK_SECRET, Utc::now().timestamp())?;
        parse_event(body)
    }
}

/// Notifier double
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(id, _)| *id == chat_id)
            .map(|(_, message)| message)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, chat_id: i64, message: &str) -> bool {
        self.sent.lock().unwrap().push((chat_id, message.to_string()));
        true
    }
}

/// Store call that [`FailOnceStore`] can be armed to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCall {
    UpdateOne,
    FindOneAndUpdate,
}

/// In-memory store that fails one armed call with a database error
pub struct FailOnceStore {
    inner: MemoryStore,
    armed: Mutex<Option<(StoreCall, &'static str, usize)>>,
    tripped: AtomicBool,
}

impl FailOnceStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            armed: Mutex::new(None),
            tripped: AtomicBool::new(false),
        }
    }

    /// Let `skip` matching calls through, then fail the next `call` against `collection`
    pub fn arm(&self, call: StoreCall, collection: &'static str, skip: usize) {
        *self.armed.lock().unwrap() = Some((call, collection, skip));
    }

    pub fn tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    fn check(&self, call: StoreCall, collection: &str) -> Result<(), StoreError> {
        let mut armed = self.armed.lock().unwrap();
        let Some((armed_call, armed_collection, skip)) = *armed else {
            return Ok(());
        };
        if armed_call != call || armed_collection != collection {
            return Ok(());
        }
        if skip > 0 {
            *armed = Some((armed_call, armed_collection, skip - 1));
            return Ok(());
        }
        *armed = None;
        self.tripped.store(true, Ordering::SeqCst);
        Err(StoreError::Database("connection reset".to_string()))
    }
}

#[async_trait]
impl DocumentStore for FailOnceStore {
    async fn insert(&self, collection: &str, document: Value) -> Result<(), StoreError> {
        self.inner.insert(collection, document).await
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Value>, StoreError> {
        self.inner.find_one(collection, filter).await
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StoreError> {
        self.inner.find_many(collection, filter, options).await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.count(collection, filter).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        self.check(StoreCall::UpdateOne, collection)?;
        self.inner.update_one(collection, filter, update).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError> {
        self.inner.update_many(collection, filter, update).await
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<Value>, StoreError> {
        self.check(StoreCall::FindOneAndUpdate, collection)?;
        self.inner.find_one_and_update(collection, filter, update).await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.delete_one(collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.inner.delete_many(collection, filter).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.inner.ping().await
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<dyn DocumentStore>,
    pub provider: Arc<MockProvider>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(StockPolicy::AllowNegative)
    }

    pub fn with_policy(stock_policy: StockPolicy) -> Self {
        Self::build(stock_policy, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        Self::build(StockPolicy::AllowNegative, store)
    }

    fn build(stock_policy: StockPolicy, store: Arc<dyn DocumentStore>) -> Self {
        let config = Config {
            store_backend: StoreBackend::Memory,
            telegram_bot_token: Some(BOT_TOKEN.to_string()),
            stripe_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            stock_policy,
            ..Config::default()
        };

        let provider = Arc::new(MockProvider::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let state = AppState::new(&config, store.clone(), provider.clone(), notifier.clone());
        let router = build_router(state.clone(), &config);

        Self {
            router,
            state,
            store,
            provider,
            notifier,
        }
    }

    /// Insert a user directly, bypassing registration
    pub async fn seed_user(&self, role: UserRole, telegram_id: Option<i64>) -> User {
        let id = Uuid::new_v4();
        let user = User {
            id,
            email: Some(format!("{}@example.com", id.simple())),
            password_hash: None,
            full_name: format!("{} {}", role.as_str(), &id.simple().to_string()[..6]),
            role,
            avatar: None,
            balance: 0.0,
            telegram_id,
            telegram_username: None,
            created_at: Utc::now(),
        };
        self.store
            .insert_record(collections::USERS, &user)
            .await
            .unwrap();
        user
    }

    pub async fn seed_product(&self, seller: &User, price: f64, stock: i64) -> Product {
        let product = Product {
            id: Uuid::new_v4(),
            title: format!("Game key {}", &Uuid::new_v4().simple().to_string()[..6]),
            description: String::new(),
            price,
            product_type: "key".to_string(),
            images: Vec::new(),
            category_id: None,
            seller_id: seller.id,
            stock,
            sales_count: 0,
            views_count: 0,
            created_at: Utc::now(),
        };
        self.store
            .insert_record(collections::PRODUCTS, &product)
            .await
            .unwrap();
        product
    }

    pub async fn product(&self, product_id: Uuid) -> Product {
        self.state
            .catalog_service
            .find_product(product_id)
            .await
            .unwrap()
    }

    pub fn token(&self, user: &User) -> String {
        self.state.auth_service.issue_session_token(user.id).unwrap()
    }

    /// Send a JSON request and decode the JSON response (Null when empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.call(request).await
    }

    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    /// Deliver a provider webhook signed with the test secret
    pub async fn deliver_webhook(&self, payload: &Value) -> (StatusCode, Value) {
        let body = payload.to_string();
        let signature =
            sign_webhook_payload(body.as_bytes(), WEBHOOK_SECRET, Utc::now().timestamp()).unwrap();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/webhook/stripe")
            .header("content-type", "application/json")
            .header("stripe-signature", signature)
            .body(Body::from(body))
            .unwrap();
        self.call(request).await
    }
}

/// Body of a `checkout.session.completed` event for `session_id`
pub fn checkout_completed(session_id: &str) -> Value {
    serde_json::json!({
        "id": format!("evt_{}", session_id),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "payment_status": "paid"
            }
        }
    })
}
