//! Giveaway models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GiveawayStatus {
    Active,
    Ended,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Giveaway {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Products given away
    #[serde(default)]
    pub products: Vec<Uuid>,
    /// Users who entered, in entry order
    #[serde(default)]
    pub entries: Vec<Uuid>,
    #[serde(default)]
    pub winner_id: Option<Uuid>,
    pub end_date: DateTime<Utc>,
    pub status: GiveawayStatus,
}

impl Giveaway {
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.status == GiveawayStatus::Active && now < self.end_date
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct GiveawayRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub products: Vec<Uuid>,
    pub end_date: DateTime<Utc>,
    /// Only honoured on update
    #[serde(default)]
    pub status: Option<GiveawayStatus>,
    #[serde(default)]
    pub winner_id: Option<Uuid>,
}

/// Result of entering a giveaway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    Entered,
    AlreadyEntered,
}

impl EntryOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            EntryOutcome::Entered => "Entered giveaway",
            EntryOutcome::AlreadyEntered => "Already entered",
        }
    }
}
