//! Order service layer

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::Product;
use crate::config::StockPolicy;
use crate::error::{ApiError, ApiResult};
use crate::models::{round_money, Pagination, User};
use crate::orders::{
    CreateOrderRequest, Order, OrderItem, OrderListQuery, OrderStatus, MAX_ITEM_QUANTITY,
};
use crate::store::{collections, DocumentStore, Filter, FindOptions, Update};

const DEFAULT_CURRENCY: &str = "usd";

pub struct OrderService {
    store: Arc<dyn DocumentStore>,
    stock_policy: StockPolicy,
}

fn normalize_currency(currency: Option<&str>) -> ApiResult<String> {
    let currency = currency.unwrap_or(DEFAULT_CURRENCY).trim().to_lowercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::BadRequest(format!(
            "Invalid currency code: {}",
            currency
        )));
    }
    Ok(currency)
}

impl OrderService {
    pub fn new(store: Arc<dyn DocumentStore>, stock_policy: StockPolicy) -> Self {
        Self {
            store,
            stock_policy,
        }
    }

    /// Create a pending order, snapshotting catalog titles and prices
    pub async fn create_order(&self, buyer: &User, request: CreateOrderRequest) -> ApiResult<Order> {
        let currency = normalize_currency(request.currency.as_deref())?;

        // Merge repeated products so stock checks see the full quantity
        let mut quantities: Vec<(Uuid, i64)> = Vec::new();
        for item in &request.items {
            if !(1..=MAX_ITEM_QUANTITY).contains(&item.quantity) {
                return Err(ApiError::BadRequest(format!(
                    "Quantity must be between 1 and {}",
                    MAX_ITEM_QUANTITY
                )));
            }
            match quantities.iter_mut().find(|(id, _)| *id == item.product_id) {
                Some((_, quantity)) => {
                    *quantity = quantity
                        .checked_add(item.quantity)
                        .filter(|total| *total <= MAX_ITEM_QUANTITY)
                        .ok_or_else(|| {
                            ApiError::BadRequest(format!(
                                "Quantity must be between 1 and {}",
                                MAX_ITEM_QUANTITY
                            ))
                        })?;
                }
                None => quantities.push((item.product_id, item.quantity)),
            }
        }

        let ids: Vec<Uuid> = quantities.iter().map(|(id, _)| *id).collect();
        let products: HashMap<Uuid, Product> = self
            .store
            .find_records::<Product>(
                collections::PRODUCTS,
                &Filter::new().is_in("id", ids.iter()),
                &FindOptions::new(),
            )
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut items = Vec::with_capacity(quantities.len());
        for (product_id, quantity) in quantities {
            let product = products
                .get(&product_id)
                .ok_or_else(|| ApiError::NotFound(format!("Product not found: {}", product_id)))?;

            if self.stock_policy == StockPolicy::RejectOversell && product.stock < quantity {
                return Err(ApiError::InvalidState(format!(
                    "Insufficient stock for {}",
                    product.title
                )));
            }

            items.push(OrderItem {
                product_id,
                title: product.title.clone(),
                price: product.price,
                quantity,
            });
        }

        let total = round_money(items.iter().map(OrderItem::subtotal).sum());

        let order = Order {
            id: Uuid::new_v4(),
            user_id: buyer.id,
            items,
            total,
            currency,
            status: OrderStatus::Pending,
            payment_id: None,
            created_at: Utc::now(),
            paid_at: None,
            stock_applied: Vec::new(),
            oversold: Vec::new(),
            notified: false,
        };

        self.store.insert_record(collections::ORDERS, &order).await?;

        tracing::info!(order_id = %order.id, buyer_id = %buyer.id, total = order.total, "Order created");
        Ok(order)
    }

    async fn find_order(&self, order_id: Uuid) -> ApiResult<Order> {
        self.store
            .find_record(collections::ORDERS, &Filter::by_id(order_id))
            .await?
            .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
    }

    /// Visible to the buyer and to admins
    pub async fn get_order(&self, order_id: Uuid, requester: &User) -> ApiResult<Order> {
        let order = self.find_order(order_id).await?;
        if !order.is_visible_to(requester) {
            return Err(ApiError::Forbidden("Not authorized".to_string()));
        }
        Ok(order)
    }

    pub async fn list_for_user(&self, user: &User) -> ApiResult<Vec<Order>> {
        Ok(self
            .store
            .find_records(
                collections::ORDERS,
                &Filter::new().eq("user_id", user.id),
                &FindOptions::new().sort_desc("created_at"),
            )
            .await?)
    }

    pub async fn list_all(&self, query: &OrderListQuery) -> ApiResult<Vec<Order>> {
        let filter = match query.status {
            Some(status) => Filter::new().eq("status", status),
            None => Filter::new(),
        };
        let page = Pagination {
            skip: query.skip,
            limit: query.limit,
        };
        Ok(self
            .store
            .find_records(collections::ORDERS, &filter, &page.newest_first("created_at"))
            .await?)
    }

    /// Admin transition, applied only if the order is still in the state it was read in
    pub async fn update_status(&self, order_id: Uuid, next: OrderStatus) -> ApiResult<Order> {
        let order = self.find_order(order_id).await?;
        if !order.status.admin_can_transition_to(next) {
            return Err(ApiError::InvalidState(format!(
                "Cannot change order from {} to {}",
                order.status.as_str(),
                next.as_str()
            )));
        }

        let updated: Option<Order> = self
            .store
            .find_record_and_update(
                collections::ORDERS,
                &Filter::by_id(order_id).eq("status", order.status),
                &Update::new().set("status", next),
            )
            .await?;

        let updated = updated.ok_or_else(|| {
            ApiError::InvalidState("Order status changed concurrently".to_string())
        })?;

        tracing::info!(
            order_id = %order_id,
            from = order.status.as_str(),
            to = next.as_str(),
            "Order status updated"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;
    use crate::orders::OrderItemRequest;
    use crate::store::MemoryStore;

    fn buyer() -> User {
        User {
            id: Uuid::new_v4(),
            email: Some("orders@gamehub.test".to_string()),
            password_hash: None,
            full_name: "Orders".to_string(),
            role: UserRole::Buyer,
            avatar: None,
            balance: 0.0,
            telegram_id: None,
            telegram_username: None,
            created_at: Utc::now(),
        }
    }

    async fn with_product(price: f64) -> (OrderService, Uuid) {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let product = Product {
            id: Uuid::new_v4(),
            title: "Key".to_string(),
            description: String::new(),
            price,
            product_type: "key".to_string(),
            images: Vec::new(),
            category_id: None,
            seller_id: Uuid::new_v4(),
            stock: 1,
            sales_count: 0,
            views_count: 0,
            created_at: Utc::now(),
        };
        store
            .insert_record(collections::PRODUCTS, &product)
            .await
            .unwrap();
        (
            OrderService::new(store, StockPolicy::AllowNegative),
            product.id,
        )
    }

    fn lines(product_id: Uuid, quantities: &[i64]) -> CreateOrderRequest {
        CreateOrderRequest {
            items: quantities
                .iter()
                .map(|&quantity| OrderItemRequest {
                    product_id,
                    quantity,
                })
                .collect(),
            currency: None,
        }
    }

    #[tokio::test]
    async fn test_merged_quantity_is_bounded() {
        let (orders, product_id) = with_product(2.5).await;

        let overflow = orders
            .create_order(&buyer(), lines(product_id, &[i64::MAX, 1]))
            .await;
        assert!(matches!(overflow, Err(ApiError::BadRequest(_))));

        let too_many = orders
            .create_order(&buyer(), lines(product_id, &[MAX_ITEM_QUANTITY, 1]))
            .await;
        assert!(matches!(too_many, Err(ApiError::BadRequest(_))));

        let order = orders
            .create_order(&buyer(), lines(product_id, &[2, 3]))
            .await
            .unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 5);
        assert_eq!(order.total, 12.5);
    }

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency(None).unwrap(), "usd");
        assert_eq!(normalize_currency(Some("EUR")).unwrap(), "eur");
        assert!(normalize_currency(Some("euro")).is_err());
        assert!(normalize_currency(Some("u$d")).is_err());
    }
}
