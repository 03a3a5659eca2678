//! Admin operations that span domains: dashboard stats, user management
//! and site settings. Order, product, transaction and content management
//! live with their own services.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::admin::{AdminStats, SiteSettings};
use crate::error::{ApiError, ApiResult};
use crate::models::{round_money, Pagination, User, UserResponse, UserRole};
use crate::orders::{Order, OrderStatus};
use crate::store::{collections, decode, DocumentStore, Filter, FindOptions, StoreError, Update};

/// Site settings are a single document
const SETTINGS_ID: &str = "site";

const ORDER_STATUSES: [OrderStatus; 4] = [
    OrderStatus::Pending,
    OrderStatus::Paid,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
];

pub struct AdminService {
    store: Arc<dyn DocumentStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn stats(&self) -> ApiResult<AdminStats> {
        let everything = Filter::new();
        let total_users = self.store.count(collections::USERS, &everything).await?;
        let total_products = self.store.count(collections::PRODUCTS, &everything).await?;
        let total_orders = self.store.count(collections::ORDERS, &everything).await?;

        let mut orders_by_status = BTreeMap::new();
        for status in ORDER_STATUSES {
            let count = self
                .store
                .count(collections::ORDERS, &Filter::new().eq("status", status))
                .await?;
            orders_by_status.insert(status.as_str().to_string(), count);
        }

        // Completed orders were paid first, so they count as revenue too
        let paid: Vec<Order> = self
            .store
            .find_records(
                collections::ORDERS,
                &Filter::new().is_in("status", [OrderStatus::Paid, OrderStatus::Completed]),
                &FindOptions::new(),
            )
            .await?;
        let total_revenue = round_money(paid.iter().map(|o| o.total).sum());

        Ok(AdminStats {
            total_users,
            total_products,
            total_orders,
            total_revenue,
            orders_by_status,
        })
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub async fn list_users(&self, page: Pagination) -> ApiResult<Vec<UserResponse>> {
        let users: Vec<User> = self
            .store
            .find_records(
                collections::USERS,
                &Filter::new(),
                &page.newest_first("created_at"),
            )
            .await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    pub async fn set_role(&self, user_id: Uuid, role: UserRole) -> ApiResult<UserResponse> {
        let user: User = self
            .store
            .find_record_and_update(
                collections::USERS,
                &Filter::by_id(user_id),
                &Update::new().set("role", role),
            )
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        tracing::info!(user_id = %user_id, role = role.as_str(), "User role changed");
        Ok(UserResponse::from(user))
    }

    pub async fn delete_user(&self, admin: &User, user_id: Uuid) -> ApiResult<()> {
        if admin.id == user_id {
            return Err(ApiError::BadRequest(
                "Cannot delete your own account".to_string(),
            ));
        }

        let deleted = self
            .store
            .delete_one(collections::USERS, &Filter::by_id(user_id))
            .await?;
        if deleted == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }

        self.store
            .delete_many(collections::TOKENS, &Filter::new().eq("user_id", user_id))
            .await?;

        tracing::info!(user_id = %user_id, admin_id = %admin.id, "User deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Site settings
    // ------------------------------------------------------------------

    /// Stored settings, or the defaults when nothing was saved yet
    pub async fn settings(&self) -> ApiResult<SiteSettings> {
        match self
            .store
            .find_one(collections::SITE_SETTINGS, &Filter::by_id(SETTINGS_ID))
            .await?
        {
            Some(document) => Ok(decode(collections::SITE_SETTINGS, document)?),
            None => Ok(SiteSettings::default()),
        }
    }

    pub async fn save_settings(&self, settings: SiteSettings) -> ApiResult<SiteSettings> {
        let Value::Object(fields) = serde_json::to_value(&settings)? else {
            return Err(ApiError::InternalError(
                "Settings did not serialize to an object".to_string(),
            ));
        };

        let update = fields
            .iter()
            .fold(Update::new(), |update, (name, value)| update.set(name, value));

        if self.upsert_settings(&update, &fields).await? {
            return Ok(settings);
        }
        // A concurrent first save won the insert; apply ours over it
        self.store
            .update_one(
                collections::SITE_SETTINGS,
                &Filter::by_id(SETTINGS_ID),
                &update,
            )
            .await?;
        Ok(settings)
    }

    /// Returns false when the insert lost a race to another first save
    async fn upsert_settings(
        &self,
        update: &Update,
        fields: &serde_json::Map<String, Value>,
    ) -> ApiResult<bool> {
        let matched = self
            .store
            .update_one(collections::SITE_SETTINGS, &Filter::by_id(SETTINGS_ID), update)
            .await?;
        if matched > 0 {
            return Ok(true);
        }

        let mut document = fields.clone();
        document.insert("id".to_string(), Value::from(SETTINGS_ID));
        match self
            .store
            .insert(collections::SITE_SETTINGS, Value::Object(document))
            .await
        {
            Ok(()) => Ok(true),
            Err(StoreError::Duplicate(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn user(role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            email: None,
            password_hash: None,
            full_name: "Someone".to_string(),
            role,
            avatar: None,
            balance: 0.0,
            telegram_id: None,
            telegram_username: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_settings_default_then_saved() {
        let service = AdminService::new(Arc::new(MemoryStore::new()));
        assert_eq!(service.settings().await.unwrap().site_name, "GameHub");

        let custom = SiteSettings {
            site_name: "Keys4All".to_string(),
            ..SiteSettings::default()
        };
        service.save_settings(custom.clone()).await.unwrap();
        assert_eq!(service.settings().await.unwrap(), custom);

        let renamed = SiteSettings {
            site_name: "Keys4All Pro".to_string(),
            ..custom
        };
        service.save_settings(renamed).await.unwrap();
        assert_eq!(service.settings().await.unwrap().site_name, "Keys4All Pro");
    }

    #[tokio::test]
    async fn test_admin_cannot_delete_self() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let admin = user(UserRole::Admin);
        store.insert_record(collections::USERS, &admin).await.unwrap();
        let service = AdminService::new(store);

        let err = service.delete_user(&admin, admin.id).await.unwrap_err();
        assert_eq!(err.error_code(), "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_role_change() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let buyer = user(UserRole::Buyer);
        store.insert_record(collections::USERS, &buyer).await.unwrap();
        let service = AdminService::new(store);

        let updated = service.set_role(buyer.id, UserRole::Seller).await.unwrap();
        assert_eq!(updated.role, UserRole::Seller);

        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total_users, 1);
        assert_eq!(stats.total_revenue, 0.0);
        assert_eq!(stats.orders_by_status["pending"], 0);
    }
}
