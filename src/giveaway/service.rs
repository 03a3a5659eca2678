//! Giveaways

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::giveaway::{EntryOutcome, Giveaway, GiveawayRequest, GiveawayStatus};
use crate::models::User;
use crate::store::{collections, DocumentStore, Filter, FindOptions, Update};

pub struct GiveawayService {
    store: Arc<dyn DocumentStore>,
}

impl GiveawayService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> ApiResult<Vec<Giveaway>> {
        Ok(self
            .store
            .find_records(
                collections::GIVEAWAYS,
                &Filter::new(),
                &FindOptions::new().sort_asc("end_date"),
            )
            .await?)
    }

    pub async fn get(&self, giveaway_id: Uuid) -> ApiResult<Giveaway> {
        self.store
            .find_record(collections::GIVEAWAYS, &Filter::by_id(giveaway_id))
            .await?
            .ok_or_else(|| ApiError::NotFound("Giveaway not found".to_string()))
    }

    /// Add the user to the entries. Entering twice is a no-op.
    pub async fn enter(&self, giveaway_id: Uuid, user: &User) -> ApiResult<EntryOutcome> {
        let giveaway = self.get(giveaway_id).await?;
        if giveaway.entries.contains(&user.id) {
            return Ok(EntryOutcome::AlreadyEntered);
        }
        if !giveaway.is_open_at(Utc::now()) {
            return Err(ApiError::InvalidState("Giveaway has ended".to_string()));
        }

        let matched = self
            .store
            .update_one(
                collections::GIVEAWAYS,
                &Filter::by_id(giveaway_id)
                    .eq("status", GiveawayStatus::Active)
                    .lacks("entries", user.id),
                &Update::new().push("entries", user.id),
            )
            .await?;
        if matched == 1 {
            return Ok(EntryOutcome::Entered);
        }

        // Lost a race: either a concurrent entry by the same user or the giveaway closed
        let current = self.get(giveaway_id).await?;
        if current.entries.contains(&user.id) {
            Ok(EntryOutcome::AlreadyEntered)
        } else {
            Err(ApiError::InvalidState("Giveaway has ended".to_string()))
        }
    }

    pub async fn create(&self, request: GiveawayRequest) -> ApiResult<Giveaway> {
        let giveaway = Giveaway {
            id: Uuid::new_v4(),
            title: request.title,
            description: request.description,
            products: request.products,
            entries: Vec::new(),
            winner_id: None,
            end_date: request.end_date,
            status: GiveawayStatus::Active,
        };
        self.store
            .insert_record(collections::GIVEAWAYS, &giveaway)
            .await?;

        tracing::info!(giveaway_id = %giveaway.id, "Giveaway created");
        Ok(giveaway)
    }

    pub async fn update(&self, giveaway_id: Uuid, request: GiveawayRequest) -> ApiResult<Giveaway> {
        let current = self.get(giveaway_id).await?;
        if let Some(winner_id) = request.winner_id {
            if !current.entries.contains(&winner_id) {
                return Err(ApiError::BadRequest(
                    "Winner must be one of the entrants".to_string(),
                ));
            }
        }

        let mut update = Update::new()
            .set("title", &request.title)
            .set("description", &request.description)
            .set("products", &request.products)
            .set("end_date", request.end_date);
        if let Some(status) = request.status {
            update = update.set("status", status);
        }
        if let Some(winner_id) = request.winner_id {
            update = update.set("winner_id", winner_id);
        }

        self.store
            .find_record_and_update(collections::GIVEAWAYS, &Filter::by_id(giveaway_id), &update)
            .await?
            .ok_or_else(|| ApiError::NotFound("Giveaway not found".to_string()))
    }

    pub async fn delete(&self, giveaway_id: Uuid) -> ApiResult<()> {
        let deleted = self
            .store
            .delete_one(collections::GIVEAWAYS, &Filter::by_id(giveaway_id))
            .await?;
        if deleted == 0 {
            return Err(ApiError::NotFound("Giveaway not found".to_string()));
        }
        Ok(())
    }
}
