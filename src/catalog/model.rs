//! Catalog data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Pagination;
use crate::store::FindOptions;

/// Product listing
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default = "default_product_type")]
    pub product_type: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    pub seller_id: Uuid,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub sales_count: i64,
    #[serde(default)]
    pub views_count: i64,
    pub created_at: DateTime<Utc>,
}

fn default_product_type() -> String {
    "key".to_string()
}

/// Create product request
#[derive(Debug, Deserialize, Validate)]
pub struct ProductRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub description: String,
    #[validate(range(min = 0.01, message = "Price must be positive"))]
    pub price: f64,
    #[serde(default = "default_product_type")]
    pub product_type: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: i64,
}

/// Partial product update
#[derive(Debug, Deserialize, Validate, Default)]
pub struct ProductUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 10000))]
    pub description: Option<String>,
    #[validate(range(min = 0.01, message = "Price must be positive"))]
    pub price: Option<f64>,
    pub product_type: Option<String>,
    pub images: Option<Vec<String>>,
    pub category_id: Option<Uuid>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock: Option<i64>,
}

/// Ordering for product listings
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    Popular,
    PriceAsc,
    PriceDesc,
}

/// Product listing query
#[derive(Debug, Deserialize, Default)]
pub struct ProductQuery {
    pub category: Option<Uuid>,
    pub search: Option<String>,
    pub product_type: Option<String>,
    pub seller_id: Option<Uuid>,
    #[serde(default)]
    pub sort: ProductSort,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
}

impl ProductQuery {
    pub fn find_options(&self) -> FindOptions {
        let page = Pagination {
            skip: self.skip,
            limit: self.limit,
        };
        match self.sort {
            ProductSort::Newest => page.newest_first("created_at"),
            ProductSort::Popular => page.newest_first("sales_count"),
            ProductSort::PriceDesc => page.newest_first("price"),
            ProductSort::PriceAsc => page.newest_first("price").sort_asc("price"),
        }
    }
}

/// Product category
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Create or update a category
#[derive(Debug, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// `?parent_id=` filter for category listings
#[derive(Debug, Deserialize, Default)]
pub struct CategoryQuery {
    pub parent_id: Option<Uuid>,
}

/// Saved product
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Add-to-favorites request
#[derive(Debug, Deserialize)]
pub struct FavoriteRequest {
    pub product_id: Uuid,
}

/// Recently viewed product entry
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ViewedProduct {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}
