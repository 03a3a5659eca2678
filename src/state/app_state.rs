//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::admin::AdminService;
use crate::auth::{AuthService, AuthSettings};
use crate::blog::BlogService;
use crate::catalog::CatalogService;
use crate::chat::ChatService;
use crate::config::Config;
use crate::giveaway::GiveawayService;
use crate::notify::Notifier;
use crate::orders::OrderService;
use crate::payments::{PaymentProvider, PaymentService};
use crate::store::DocumentStore;
use crate::wallet::WalletService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub auth_service: Arc<AuthService>,
    pub catalog_service: Arc<CatalogService>,
    pub order_service: Arc<OrderService>,
    pub payment_service: Arc<PaymentService>,
    pub chat_service: Arc<ChatService>,
    pub giveaway_service: Arc<GiveawayService>,
    pub blog_service: Arc<BlogService>,
    pub wallet_service: Arc<WalletService>,
    pub admin_service: Arc<AdminService>,
}

impl AppState {
    /// Wire every service over one store, payment provider and notifier
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let auth_service = Arc::new(AuthService::new(
            store.clone(),
            AuthSettings::from_config(config),
        ));
        let payment_service = Arc::new(PaymentService::new(
            store.clone(),
            provider,
            notifier.clone(),
            config.public_url.trim_end_matches('/').to_string(),
            config.stock_policy,
        ));

        Self {
            auth_service,
            catalog_service: Arc::new(CatalogService::new(store.clone())),
            order_service: Arc::new(OrderService::new(store.clone(), config.stock_policy)),
            payment_service,
            chat_service: Arc::new(ChatService::new(store.clone(), notifier)),
            giveaway_service: Arc::new(GiveawayService::new(store.clone())),
            blog_service: Arc::new(BlogService::new(store.clone())),
            wallet_service: Arc::new(WalletService::new(store.clone())),
            admin_service: Arc::new(AdminService::new(store.clone())),
            store,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<dyn DocumentStore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}
