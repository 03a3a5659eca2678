//! Persistence gateway
//!
//! Every component reads and writes JSON documents in named collections
//! through [`DocumentStore`]. Conditional updates (`update_one`,
//! `find_one_and_update`) are atomic: the filter is evaluated and the
//! modification applied as one step, so they double as compare-and-swap.
//! Typed records are decoded at this boundary; a document that does not
//! decode surfaces as [`StoreError::Decode`] instead of a missing field.

mod filter;
mod memory;
mod postgres;

use axum::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use filter::{Condition, Filter, FindOptions, SortOrder, Update};
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// Collection names
pub mod collections {
    pub const USERS: &str = "users";
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const ORDERS: &str = "orders";
    pub const PAYMENT_SESSIONS: &str = "payment_transactions";
    pub const TRANSACTIONS: &str = "transactions";
    pub const TOKENS: &str = "tokens";
    pub const CHATS: &str = "chats";
    pub const CHAT_MESSAGES: &str = "chat_messages";
    pub const GIVEAWAYS: &str = "giveaways";
    pub const BLOG_POSTS: &str = "blog_posts";
    pub const FAVORITES: &str = "favorites";
    pub const VIEWED_PRODUCTS: &str = "viewed_products";
    pub const SITE_SETTINGS: &str = "site_settings";
}

/// Fields that must be unique within a collection when present.
/// Mirrored by the partial unique indexes in the migrations.
pub const UNIQUE_FIELDS: &[(&str, &str)] = &[
    (collections::USERS, "email"),
    (collections::USERS, "telegram_id"),
    (collections::PAYMENT_SESSIONS, "session_id"),
    (collections::TOKENS, "token"),
];

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Duplicate value for unique field in {0}")]
    Duplicate(String),

    #[error("Failed to decode {collection} document: {reason}")]
    Decode { collection: String, reason: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::Duplicate(
                    db_err.constraint().unwrap_or("documents").to_string(),
                );
            }
        }
        StoreError::Database(e.to_string())
    }
}

/// Uniform document persistence interface
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document. It must carry a string `id` field.
    async fn insert(&self, collection: &str, document: Value) -> Result<(), StoreError>;

    async fn find_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Value>, StoreError>;

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>, StoreError>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Apply `update` to the first matching document; returns how many matched (0 or 1)
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError>;

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<u64, StoreError>;

    /// Apply `update` to the first matching document and return it as modified
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<Value>, StoreError>;

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;

    /// Connectivity check for health endpoints
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Decode a raw document into a typed record
pub fn decode<T: DeserializeOwned>(collection: &str, document: Value) -> Result<T, StoreError> {
    serde_json::from_value(document).map_err(|e| StoreError::Decode {
        collection: collection.to_string(),
        reason: e.to_string(),
    })
}

fn encode<T: Serialize>(record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record).map_err(|e| StoreError::InvalidDocument(e.to_string()))
}

/// Typed helpers over the raw document interface
impl dyn DocumentStore {
    pub async fn insert_record<T: Serialize + Sync>(
        &self,
        collection: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        self.insert(collection, encode(record)?).await
    }

    pub async fn find_record<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<T>, StoreError> {
        self.find_one(collection, filter)
            .await?
            .map(|doc| decode(collection, doc))
            .transpose()
    }

    pub async fn find_records<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<T>, StoreError> {
        self.find_many(collection, filter, options)
            .await?
            .into_iter()
            .map(|doc| decode(collection, doc))
            .collect()
    }

    pub async fn find_record_and_update<T: DeserializeOwned>(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<Option<T>, StoreError> {
        self.find_one_and_update(collection, filter, update)
            .await?
            .map(|doc| decode(collection, doc))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Record {
        #[allow(dead_code)]
        id: String,
        count: i64,
    }

    #[test]
    fn test_decode_reports_collection() {
        let err = decode::<Record>("products", json!({"id": "x", "count": "many"})).unwrap_err();
        match err {
            StoreError::Decode { collection, .. } => assert_eq!(collection, "products"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_ok() {
        let record: Record = decode("products", json!({"id": "x", "count": 3})).unwrap();
        assert_eq!(record.count, 3);
    }
}
