//! Catalog service: products, categories, sellers, favorites and recently viewed

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog::{
    Category, CategoryQuery, CategoryRequest, Favorite, Product, ProductQuery, ProductRequest,
    ProductUpdate, ViewedProduct,
};
use crate::error::{ApiError, ApiResult};
use crate::models::{Pagination, SellerProfile, User, UserRole};
use crate::store::{collections, DocumentStore, Filter, FindOptions, Update};

const SIMILAR_PRODUCTS_LIMIT: u64 = 8;
const VIEWED_PRODUCTS_LIMIT: u64 = 20;

pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    pub async fn list_products(&self, query: &ProductQuery) -> ApiResult<Vec<Product>> {
        let mut filter = Filter::new();
        if let Some(category) = query.category {
            filter = filter.eq("category_id", category);
        }
        if let Some(product_type) = &query.product_type {
            filter = filter.eq("product_type", product_type);
        }
        if let Some(seller_id) = query.seller_id {
            filter = filter.eq("seller_id", seller_id);
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            filter = filter.any_of(vec![
                Filter::new().contains("title", search),
                Filter::new().contains("description", search),
            ]);
        }

        Ok(self
            .store
            .find_records(collections::PRODUCTS, &filter, &query.find_options())
            .await?)
    }

    /// Fetch without side effects
    pub async fn find_product(&self, product_id: Uuid) -> ApiResult<Product> {
        self.store
            .find_record(collections::PRODUCTS, &Filter::by_id(product_id))
            .await?
            .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
    }

    /// Fetch for display; counts a view
    pub async fn get_product(&self, product_id: Uuid) -> ApiResult<Product> {
        self.store
            .find_record_and_update(
                collections::PRODUCTS,
                &Filter::by_id(product_id),
                &Update::new().inc("views_count", 1.0),
            )
            .await?
            .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
    }

    pub async fn products_by_ids(&self, ids: &[Uuid]) -> ApiResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .store
            .find_records(
                collections::PRODUCTS,
                &Filter::new().is_in("id", ids.iter()),
                &FindOptions::new(),
            )
            .await?)
    }

    pub async fn create_product(&self, seller: &User, request: ProductRequest) -> ApiResult<Product> {
        if let Some(category_id) = request.category_id {
            self.get_category(category_id).await?;
        }

        let product = Product {
            id: Uuid::new_v4(),
            title: request.title.trim().to_string(),
            description: request.description,
            price: request.price,
            product_type: request.product_type,
            images: request.images,
            category_id: request.category_id,
            seller_id: seller.id,
            stock: request.stock,
            sales_count: 0,
            views_count: 0,
            created_at: Utc::now(),
        };

        self.store
            .insert_record(collections::PRODUCTS, &product)
            .await?;

        tracing::info!(product_id = %product.id, seller_id = %seller.id, "Product created");
        Ok(product)
    }

    fn ensure_can_edit(user: &User, product: &Product) -> ApiResult<()> {
        if product.seller_id == user.id || user.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Not authorized".to_string()))
        }
    }

    pub async fn update_product(
        &self,
        user: &User,
        product_id: Uuid,
        request: ProductUpdate,
    ) -> ApiResult<Product> {
        let product = self.find_product(product_id).await?;
        Self::ensure_can_edit(user, &product)?;

        if let Some(category_id) = request.category_id {
            self.get_category(category_id).await?;
        }

        let mut update = Update::new();
        if let Some(title) = request.title {
            update = update.set("title", title.trim());
        }
        if let Some(description) = request.description {
            update = update.set("description", description);
        }
        if let Some(price) = request.price {
            update = update.set("price", price);
        }
        if let Some(product_type) = request.product_type {
            update = update.set("product_type", product_type);
        }
        if let Some(images) = request.images {
            update = update.set("images", images);
        }
        if let Some(category_id) = request.category_id {
            update = update.set("category_id", category_id);
        }
        if let Some(stock) = request.stock {
            update = update.set("stock", stock);
        }

        self.store
            .find_record_and_update(collections::PRODUCTS, &Filter::by_id(product_id), &update)
            .await?
            .ok_or_else(|| ApiError::NotFound("Product not found".to_string()))
    }

    pub async fn delete_product(&self, user: &User, product_id: Uuid) -> ApiResult<()> {
        let product = self.find_product(product_id).await?;
        Self::ensure_can_edit(user, &product)?;

        self.store
            .delete_one(collections::PRODUCTS, &Filter::by_id(product_id))
            .await?;
        self.store
            .delete_many(
                collections::FAVORITES,
                &Filter::new().eq("product_id", product_id),
            )
            .await?;

        tracing::info!(product_id = %product_id, deleted_by = %user.id, "Product deleted");
        Ok(())
    }

    /// Best sellers from the same category
    pub async fn similar_products(&self, product_id: Uuid) -> ApiResult<Vec<Product>> {
        let product = self.find_product(product_id).await?;

        let mut filter = Filter::new().ne("id", product_id);
        if let Some(category_id) = product.category_id {
            filter = filter.eq("category_id", category_id);
        } else {
            filter = filter.eq("product_type", &product.product_type);
        }

        Ok(self
            .store
            .find_records(
                collections::PRODUCTS,
                &filter,
                &FindOptions::new()
                    .sort_desc("sales_count")
                    .limit(SIMILAR_PRODUCTS_LIMIT),
            )
            .await?)
    }

    // ------------------------------------------------------------------
    // Sellers
    // ------------------------------------------------------------------

    pub async fn seller_profile(&self, seller_id: Uuid) -> ApiResult<SellerProfile> {
        let user: User = self
            .store
            .find_record(collections::USERS, &Filter::by_id(seller_id))
            .await?
            .filter(|u: &User| matches!(u.role, UserRole::Seller | UserRole::Admin))
            .ok_or_else(|| ApiError::NotFound("Seller not found".to_string()))?;
        Ok(SellerProfile::from(user))
    }

    pub async fn seller_products(
        &self,
        seller_id: Uuid,
        page: Pagination,
    ) -> ApiResult<Vec<Product>> {
        Ok(self
            .store
            .find_records(
                collections::PRODUCTS,
                &Filter::new().eq("seller_id", seller_id),
                &page.newest_first("created_at"),
            )
            .await?)
    }

    // ------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------

    pub async fn list_categories(&self, query: &CategoryQuery) -> ApiResult<Vec<Category>> {
        let filter = match query.parent_id {
            Some(parent_id) => Filter::new().eq("parent_id", parent_id),
            None => Filter::new(),
        };
        Ok(self
            .store
            .find_records(
                collections::CATEGORIES,
                &filter,
                &FindOptions::new().sort_asc("name"),
            )
            .await?)
    }

    pub async fn get_category(&self, category_id: Uuid) -> ApiResult<Category> {
        self.store
            .find_record(collections::CATEGORIES, &Filter::by_id(category_id))
            .await?
            .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))
    }

    async fn level_under(&self, parent_id: Option<Uuid>) -> ApiResult<u32> {
        match parent_id {
            Some(parent_id) => {
                let parent = self.get_category(parent_id).await.map_err(|_| {
                    ApiError::BadRequest("Parent category not found".to_string())
                })?;
                Ok(parent.level + 1)
            }
            None => Ok(0),
        }
    }

    async fn ensure_slug_free(&self, slug: &str, except: Option<Uuid>) -> ApiResult<()> {
        let mut filter = Filter::new().eq("slug", slug);
        if let Some(id) = except {
            filter = filter.ne("id", id);
        }
        if self.store.count(collections::CATEGORIES, &filter).await? > 0 {
            return Err(ApiError::Conflict("Category slug already exists".to_string()));
        }
        Ok(())
    }

    pub async fn create_category(&self, request: CategoryRequest) -> ApiResult<Category> {
        self.ensure_slug_free(&request.slug, None).await?;
        let level = self.level_under(request.parent_id).await?;

        let category = Category {
            id: Uuid::new_v4(),
            name: request.name,
            slug: request.slug,
            parent_id: request.parent_id,
            level,
            description: request.description,
            image: request.image,
            created_at: Utc::now(),
        };

        self.store
            .insert_record(collections::CATEGORIES, &category)
            .await?;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        category_id: Uuid,
        request: CategoryRequest,
    ) -> ApiResult<Category> {
        self.get_category(category_id).await?;
        if request.parent_id == Some(category_id) {
            return Err(ApiError::BadRequest(
                "Category cannot be its own parent".to_string(),
            ));
        }
        self.ensure_slug_free(&request.slug, Some(category_id)).await?;
        let level = self.level_under(request.parent_id).await?;

        let update = Update::new()
            .set("name", &request.name)
            .set("slug", &request.slug)
            .set("parent_id", request.parent_id)
            .set("level", level)
            .set("description", &request.description)
            .set("image", &request.image);

        self.store
            .find_record_and_update(collections::CATEGORIES, &Filter::by_id(category_id), &update)
            .await?
            .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))
    }

    /// Refused while products or subcategories still reference it
    pub async fn delete_category(&self, category_id: Uuid) -> ApiResult<()> {
        self.get_category(category_id).await?;

        let products = self
            .store
            .count(
                collections::PRODUCTS,
                &Filter::new().eq("category_id", category_id),
            )
            .await?;
        if products > 0 {
            return Err(ApiError::InvalidState(format!(
                "Cannot delete category with {} products",
                products
            )));
        }

        let children = self
            .store
            .count(
                collections::CATEGORIES,
                &Filter::new().eq("parent_id", category_id),
            )
            .await?;
        if children > 0 {
            return Err(ApiError::InvalidState(format!(
                "Cannot delete category with {} subcategories",
                children
            )));
        }

        self.store
            .delete_one(collections::CATEGORIES, &Filter::by_id(category_id))
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Favorites
    // ------------------------------------------------------------------

    pub async fn add_favorite(&self, user: &User, product_id: Uuid) -> ApiResult<Favorite> {
        self.find_product(product_id).await?;

        let filter = Filter::new()
            .eq("user_id", user.id)
            .eq("product_id", product_id);
        if let Some(existing) = self
            .store
            .find_record(collections::FAVORITES, &filter)
            .await?
        {
            return Ok(existing);
        }

        let favorite = Favorite {
            id: Uuid::new_v4(),
            user_id: user.id,
            product_id,
            created_at: Utc::now(),
        };
        self.store
            .insert_record(collections::FAVORITES, &favorite)
            .await?;
        Ok(favorite)
    }

    pub async fn remove_favorite(&self, user: &User, product_id: Uuid) -> ApiResult<()> {
        let removed = self
            .store
            .delete_many(
                collections::FAVORITES,
                &Filter::new()
                    .eq("user_id", user.id)
                    .eq("product_id", product_id),
            )
            .await?;
        if removed == 0 {
            return Err(ApiError::NotFound("Favorite not found".to_string()));
        }
        Ok(())
    }

    pub async fn list_favorites(&self, user: &User) -> ApiResult<Vec<Product>> {
        let favorites: Vec<Favorite> = self
            .store
            .find_records(
                collections::FAVORITES,
                &Filter::new().eq("user_id", user.id),
                &FindOptions::new().sort_desc("created_at"),
            )
            .await?;
        let ids: Vec<Uuid> = favorites.iter().map(|f| f.product_id).collect();
        self.products_by_ids(&ids).await
    }

    // ------------------------------------------------------------------
    // Recently viewed
    // ------------------------------------------------------------------

    pub async fn record_view(&self, user: &User, product_id: Uuid) -> ApiResult<()> {
        self.find_product(product_id).await?;

        let filter = Filter::new()
            .eq("user_id", user.id)
            .eq("product_id", product_id);
        let now = Utc::now();
        let refreshed = self
            .store
            .update_one(
                collections::VIEWED_PRODUCTS,
                &filter,
                &Update::new().set("viewed_at", now),
            )
            .await?;

        if refreshed == 0 {
            let entry = ViewedProduct {
                id: Uuid::new_v4(),
                user_id: user.id,
                product_id,
                viewed_at: now,
            };
            self.store
                .insert_record(collections::VIEWED_PRODUCTS, &entry)
                .await?;
        }
        Ok(())
    }

    /// Most recent first
    pub async fn list_viewed(&self, user: &User) -> ApiResult<Vec<Product>> {
        let viewed: Vec<ViewedProduct> = self
            .store
            .find_records(
                collections::VIEWED_PRODUCTS,
                &Filter::new().eq("user_id", user.id),
                &FindOptions::new()
                    .sort_desc("viewed_at")
                    .limit(VIEWED_PRODUCTS_LIMIT),
            )
            .await?;

        let ids: Vec<Uuid> = viewed.iter().map(|v| v.product_id).collect();
        let products = self.products_by_ids(&ids).await?;

        Ok(ids
            .iter()
            .filter_map(|id| products.iter().find(|p| p.id == *id).cloned())
            .collect())
    }
}
