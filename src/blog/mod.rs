//! Blog posts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::models::{Pagination, User};
use crate::store::{collections, DocumentStore, Filter, FindOptions, Update};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub author_id: Uuid,
    #[serde(default)]
    pub image: Option<String>,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BlogPostRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 200, message = "Slug must be 1-200 characters"))]
    pub slug: String,
    pub content: String,
    pub image: Option<String>,
}

pub struct BlogService {
    store: Arc<dyn DocumentStore>,
}

impl BlogService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, page: Pagination) -> ApiResult<Vec<BlogPost>> {
        Ok(self
            .store
            .find_records(
                collections::BLOG_POSTS,
                &Filter::new(),
                &page.newest_first("published_at"),
            )
            .await?)
    }

    /// Every post, for the admin panel
    pub async fn list_all(&self) -> ApiResult<Vec<BlogPost>> {
        Ok(self
            .store
            .find_records(
                collections::BLOG_POSTS,
                &Filter::new(),
                &FindOptions::new().sort_desc("published_at"),
            )
            .await?)
    }

    pub async fn get_by_slug(&self, slug: &str) -> ApiResult<BlogPost> {
        self.store
            .find_record(collections::BLOG_POSTS, &Filter::new().eq("slug", slug))
            .await?
            .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
    }

    async fn ensure_slug_free(&self, slug: &str, except: Option<Uuid>) -> ApiResult<()> {
        let mut filter = Filter::new().eq("slug", slug);
        if let Some(id) = except {
            filter = filter.ne("id", id);
        }
        if self.store.count(collections::BLOG_POSTS, &filter).await? > 0 {
            return Err(ApiError::Conflict("Post slug already exists".to_string()));
        }
        Ok(())
    }

    pub async fn create(&self, author: &User, request: BlogPostRequest) -> ApiResult<BlogPost> {
        self.ensure_slug_free(&request.slug, None).await?;

        let post = BlogPost {
            id: Uuid::new_v4(),
            title: request.title,
            slug: request.slug,
            content: request.content,
            author_id: author.id,
            image: request.image,
            published_at: Utc::now(),
        };
        self.store
            .insert_record(collections::BLOG_POSTS, &post)
            .await?;
        Ok(post)
    }

    pub async fn update(&self, post_id: Uuid, request: BlogPostRequest) -> ApiResult<BlogPost> {
        self.ensure_slug_free(&request.slug, Some(post_id)).await?;

        self.store
            .find_record_and_update(
                collections::BLOG_POSTS,
                &Filter::by_id(post_id),
                &Update::new()
                    .set("title", &request.title)
                    .set("slug", &request.slug)
                    .set("content", &request.content)
                    .set("image", &request.image),
            )
            .await?
            .ok_or_else(|| ApiError::NotFound("Blog post not found".to_string()))
    }

    pub async fn delete(&self, post_id: Uuid) -> ApiResult<()> {
        let deleted = self
            .store
            .delete_one(collections::BLOG_POSTS, &Filter::by_id(post_id))
            .await?;
        if deleted == 0 {
            return Err(ApiError::NotFound("Blog post not found".to_string()));
        }
        Ok(())
    }
}
