//! Checkout and payment reconciliation
//!
//! Two unordered triggers report payment: the client polling the checkout
//! status, and the provider's webhook. Both funnel into [`PaymentService::reconcile`],
//! which uses compare-and-swap updates (session `pending → paid`, order
//! `pending → paid`, one claim per stocked line, then the `notified` flag) so
//! the stock, sales and notification side effects run exactly once.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::catalog::Product;
use crate::config::StockPolicy;
use crate::error::{ApiError, ApiResult};
use crate::models::User;
use crate::notify::{buyer_order_paid, seller_new_sale, Notifier, SaleLine};
use crate::orders::{Order, OrderItem, OrderStatus};
use crate::payments::{
    to_minor_units, CheckoutResponse, CheckoutStatusResponse, NewCheckoutSession, PaymentProvider,
    PaymentSession, ProviderPaymentStatus, ReconcileOutcome, SessionPaymentStatus, SessionStatus,
    WebhookEvent,
};
use crate::store::{collections, DocumentStore, Filter, Update};

pub struct PaymentService {
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn Notifier>,
    public_url: String,
    stock_policy: StockPolicy,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        public_url: String,
        stock_policy: StockPolicy,
    ) -> Self {
        Self {
            store,
            provider,
            notifier,
            public_url,
            stock_policy,
        }
    }

    async fn find_order(&self, order_id: Uuid) -> ApiResult<Order> {
        self.store
            .find_record(collections::ORDERS, &Filter::by_id(order_id))
            .await?
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
    }

    async fn find_session(&self, session_id: &str) -> ApiResult<Option<PaymentSession>> {
        Ok(self
            .store
            .find_record(
                collections::PAYMENT_SESSIONS,
                &Filter::new().eq("session_id", session_id),
            )
            .await?)
    }

    async fn ensure_stock(&self, order: &Order) -> ApiResult<()> {
        for item in &order.items {
            let product: Option<Product> = self
                .store
                .find_record(collections::PRODUCTS, &Filter::by_id(item.product_id))
                .await?;
            match product {
                Some(product) if product.stock >= item.quantity => {}
                _ => {
                    return Err(ApiError::InvalidState(format!(
                        "Insufficient stock for {}",
                        item.title
                    )))
                }
            }
        }
        Ok(())
    }

    /// Open a provider checkout session for a pending order owned by `requester`
    pub async fn open_checkout(
        &self,
        order_id: Uuid,
        requester: &User,
    ) -> ApiResult<CheckoutResponse> {
        let order = self.find_order(order_id).await?;
        if order.user_id != requester.id {
            return Err(ApiError::Forbidden("Not authorized".to_string()));
        }
        if order.status != OrderStatus::Pending {
            return Err(ApiError::InvalidState(format!(
                "Order is already {}",
                order.status.as_str()
            )));
        }
        if self.stock_policy == StockPolicy::RejectOversell {
            self.ensure_stock(&order).await?;
        }

        let mut metadata = BTreeMap::new();
        metadata.insert("order_id".to_string(), order.id.to_string());
        metadata.insert("user_id".to_string(), requester.id.to_string());

        let description = match order.items.as_slice() {
            [only] => only.title.clone(),
            items => format!("Order of {} items", items.len()),
        };

        let session = self
            .provider
            .create_checkout_session(NewCheckoutSession {
                amount_minor: to_minor_units(order.total, &order.currency),
                currency: order.currency.clone(),
                description,
                success_url: format!(
                    "{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}",
                    self.public_url
                ),
                cancel_url: format!("{}/checkout/cancel", self.public_url),
                metadata,
            })
            .await?;

        let record = PaymentSession {
            id: Uuid::new_v4(),
            session_id: session.id.clone(),
            order_id: order.id,
            user_id: requester.id,
            amount: order.total,
            currency: order.currency.clone(),
            payment_status: SessionPaymentStatus::Pending,
            status: SessionStatus::Initiated,
            created_at: Utc::now(),
            paid_at: None,
        };
        self.store
            .insert_record(collections::PAYMENT_SESSIONS, &record)
            .await?;

        tracing::info!(order_id = %order.id, session_id = %session.id, "Checkout session opened");

        Ok(CheckoutResponse {
            url: session.url,
            session_id: session.id,
        })
    }

    /// Poll the provider for a session and reconcile if it reports paid
    pub async fn get_status(
        &self,
        session_id: &str,
        requester: &User,
    ) -> ApiResult<CheckoutStatusResponse> {
        let session = self
            .find_session(session_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Payment session not found".to_string()))?;
        if session.user_id != requester.id && !requester.is_admin() {
            return Err(ApiError::Forbidden("Not authorized".to_string()));
        }

        let status = self.provider.get_checkout_status(session_id).await?;
        if status.payment_status == ProviderPaymentStatus::Paid {
            self.reconcile(session_id, status.payment_status).await?;
        }

        Ok(CheckoutStatusResponse {
            status: status.status,
            payment_status: status.payment_status.as_str().to_string(),
            amount_total: status.amount_total,
            currency: status.currency,
        })
    }

    /// Verify and apply a provider webhook. Rejected payloads change nothing.
    pub async fn handle_webhook(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> ApiResult<ReconcileOutcome> {
        let event = self.provider.parse_webhook(body, signature).map_err(|e| {
            tracing::warn!(error = %e, "Rejected payment webhook");
            ApiError::from(e)
        })?;

        match event {
            WebhookEvent::CheckoutPaid { session_id } => {
                let outcome = self
                    .reconcile(&session_id, ProviderPaymentStatus::Paid)
                    .await?;
                if outcome == ReconcileOutcome::UnknownSession {
                    tracing::warn!(session_id = %session_id, "Webhook for unknown payment session");
                }
                Ok(outcome)
            }
            WebhookEvent::Ignored { event_type } => {
                tracing::debug!(event_type = %event_type, "Ignoring payment webhook event");
                Ok(ReconcileOutcome::NotPaid)
            }
        }
    }

    /// Apply the paid transition for a session exactly once
    ///
    /// Every step is guarded by a conditional update, so a call that failed
    /// part-way is finished by the next poll or webhook instead of being
    /// reported as already applied.
    pub async fn reconcile(
        &self,
        session_id: &str,
        provider_status: ProviderPaymentStatus,
    ) -> ApiResult<ReconcileOutcome> {
        if provider_status != ProviderPaymentStatus::Paid {
            return Ok(ReconcileOutcome::NotPaid);
        }

        let now = Utc::now();
        let claimed: Option<PaymentSession> = self
            .store
            .find_record_and_update(
                collections::PAYMENT_SESSIONS,
                &Filter::new()
                    .eq("session_id", session_id)
                    .eq("payment_status", SessionPaymentStatus::Pending),
                &Update::new()
                    .set("payment_status", SessionPaymentStatus::Paid)
                    .set("status", SessionStatus::Completed)
                    .set("paid_at", now),
            )
            .await?;

        let session = match claimed {
            Some(session) => session,
            None => match self.find_session(session_id).await? {
                Some(session) => session,
                None => return Ok(ReconcileOutcome::UnknownSession),
            },
        };

        let Some(order) = self.claim_order(&session, now).await? else {
            tracing::warn!(
                session_id = %session_id,
                order_id = %session.order_id,
                "Payment received for an order that is no longer pending"
            );
            return Ok(ReconcileOutcome::OrderNotPending {
                order_id: session.order_id,
            });
        };

        self.apply_inventory(&order).await?;

        // Whoever flips `notified` reports the transition and sends the messages
        let finished: Option<Order> = self
            .store
            .find_record_and_update(
                collections::ORDERS,
                &Filter::by_id(order.id).eq("notified", false),
                &Update::new().set("notified", true),
            )
            .await?;
        let Some(order) = finished else {
            return Ok(ReconcileOutcome::AlreadyApplied);
        };

        tracing::info!(order_id = %order.id, session_id = %session_id, "Order paid");
        self.dispatch_notifications(&order).await;

        Ok(ReconcileOutcome::Applied {
            order_id: order.id,
            oversold: order.oversold,
        })
    }

    /// Move the session's order to paid, or pick up an order this session already paid
    async fn claim_order(
        &self,
        session: &PaymentSession,
        now: DateTime<Utc>,
    ) -> ApiResult<Option<Order>> {
        let paid: Option<Order> = self
            .store
            .find_record_and_update(
                collections::ORDERS,
                &Filter::by_id(session.order_id).eq("status", OrderStatus::Pending),
                &Update::new()
                    .set("status", OrderStatus::Paid)
                    .set("payment_id", &session.session_id)
                    .set("paid_at", now),
            )
            .await?;
        if paid.is_some() {
            return Ok(paid);
        }

        let order = self.find_order(session.order_id).await?;
        let paid_by_session = order.payment_id.as_deref() == Some(session.session_id.as_str())
            && matches!(order.status, OrderStatus::Paid | OrderStatus::Completed);
        Ok(paid_by_session.then_some(order))
    }

    /// Decrement stock and bump sales counters for every line not yet stocked.
    /// Each line is claimed on the order first, so it is applied once across callers.
    async fn apply_inventory(&self, order: &Order) -> ApiResult<()> {
        for item in &order.items {
            let claimed = self
                .store
                .update_one(
                    collections::ORDERS,
                    &Filter::by_id(order.id).lacks("stock_applied", item.product_id),
                    &Update::new().push("stock_applied", item.product_id),
                )
                .await?;
            if claimed == 0 {
                continue;
            }

            if let Err(e) = self.apply_line(order, item).await {
                let released = self
                    .store
                    .update_one(
                        collections::ORDERS,
                        &Filter::by_id(order.id),
                        &Update::new().pull("stock_applied", item.product_id),
                    )
                    .await;
                if let Err(release_error) = released {
                    tracing::error!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        error = %release_error,
                        "Could not release stock claim"
                    );
                }
                return Err(e);
            }
        }

        Ok(())
    }

    async fn apply_line(&self, order: &Order, item: &OrderItem) -> ApiResult<()> {
        let quantity = item.quantity as f64;
        let sale = Update::new()
            .inc("stock", -quantity)
            .inc("sales_count", quantity);

        let product_filter = match self.stock_policy {
            StockPolicy::AllowNegative => Filter::by_id(item.product_id),
            StockPolicy::RejectOversell => Filter::by_id(item.product_id).gte("stock", quantity),
        };
        let matched = self
            .store
            .update_one(collections::PRODUCTS, &product_filter, &sale)
            .await?;
        if matched > 0 {
            return Ok(());
        }

        tracing::warn!(
            order_id = %order.id,
            product_id = %item.product_id,
            quantity = item.quantity,
            "Stock could not be decremented for paid order"
        );
        self.store
            .update_one(
                collections::PRODUCTS,
                &Filter::by_id(item.product_id),
                &Update::new().inc("sales_count", quantity),
            )
            .await?;
        self.store
            .update_one(
                collections::ORDERS,
                &Filter::by_id(order.id),
                &Update::new().push("oversold", item.product_id),
            )
            .await?;
        Ok(())
    }

    /// One message per product to its seller and one summary to the buyer.
    /// Sends run concurrently; failures are logged by the notifier.
    async fn dispatch_notifications(&self, order: &Order) {
        let buyer = match self
            .store
            .find_record::<User>(collections::USERS, &Filter::by_id(order.user_id))
            .await
        {
            Ok(buyer) => buyer,
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "Could not load buyer for notifications");
                None
            }
        };
        let buyer_name = buyer
            .as_ref()
            .map(|b| b.full_name.clone())
            .unwrap_or_else(|| "Customer".to_string());

        let mut messages: Vec<(i64, String)> = Vec::new();

        for item in &order.items {
            let seller = match self.seller_of(item.product_id).await {
                Ok(seller) => seller,
                Err(e) => {
                    tracing::warn!(product_id = %item.product_id, error = %e, "Could not load seller for notification");
                    None
                }
            };
            if let Some(chat_id) = seller.and_then(|s| s.telegram_id) {
                messages.push((
                    chat_id,
                    seller_new_sale(
                        &item.title,
                        item.quantity,
                        item.subtotal(),
                        &order.currency,
                        &buyer_name,
                    ),
                ));
            }
        }

        if let Some(chat_id) = buyer.and_then(|b| b.telegram_id) {
            let lines: Vec<SaleLine> = order
                .items
                .iter()
                .map(|item| SaleLine {
                    title: item.title.clone(),
                    quantity: item.quantity,
                    price: item.price,
                })
                .collect();
            messages.push((
                chat_id,
                buyer_order_paid(order.id, &lines, order.total, &order.currency),
            ));
        }

        let mut sends = JoinSet::new();
        for (chat_id, message) in messages {
            let notifier = self.notifier.clone();
            sends.spawn(async move { notifier.notify(chat_id, &message).await });
        }

        let mut delivered = 0usize;
        let mut attempted = 0usize;
        while let Some(result) = sends.join_next().await {
            attempted += 1;
            if matches!(result, Ok(true)) {
                delivered += 1;
            }
        }
        tracing::debug!(order_id = %order.id, attempted, delivered, "Order notifications dispatched");
    }

    async fn seller_of(&self, product_id: Uuid) -> ApiResult<Option<User>> {
        let product: Option<Product> = self
            .store
            .find_record(collections::PRODUCTS, &Filter::by_id(product_id))
            .await?;
        let Some(product) = product else {
            return Ok(None);
        };
        Ok(self
            .store
            .find_record(collections::USERS, &Filter::by_id(product.seller_id))
            .await?)
    }
}
