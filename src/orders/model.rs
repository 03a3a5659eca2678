//! Order data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::User;

/// Order lifecycle
///
/// `pending → paid` is performed by payment reconciliation only.
/// Admins may cancel a pending order or complete a paid one.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Transitions an admin may request
    pub fn admin_can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Paid, OrderStatus::Completed)
        )
    }
}

/// Line item with title and price captured at order time
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub title: String,
    pub price: f64,
    pub quantity: i64,
}

impl OrderItem {
    pub fn subtotal(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total: f64,
    pub currency: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    /// Products whose stock was already adjusted for this payment
    #[serde(default)]
    pub stock_applied: Vec<Uuid>,
    /// Products whose stock could not cover the paid quantity
    #[serde(default)]
    pub oversold: Vec<Uuid>,
    #[serde(default)]
    pub notified: bool,
}

impl Order {
    pub fn is_visible_to(&self, user: &User) -> bool {
        self.user_id == user.id || user.is_admin()
    }
}

/// Upper bound on the quantity of one product in an order
pub const MAX_ITEM_QUANTITY: i64 = 10_000;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 10000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 50, message = "Order must contain 1-50 items"))]
    #[validate]
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// `?status=` filter for admin listings
#[derive(Debug, Deserialize, Default)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}
