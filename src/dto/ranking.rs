use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{RankingEntity, TierPlacementEntity},
    dto::{format_system_time, validation::validate_catalog_ids},
};

/// Tier assignment for one tierlist of a revealed game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RankingRequest {
    pub tierlist_id: Uuid,
    #[validate(nested)]
    pub ranking: Vec<TierPlacementInput>,
}

/// Songs placed into one tier.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TierPlacementInput {
    pub tier_id: Uuid,
    #[validate(custom(function = "validate_catalog_ids"))]
    pub songs: Vec<String>,
}

impl From<TierPlacementInput> for TierPlacementEntity {
    fn from(input: TierPlacementInput) -> Self {
        Self {
            tier_id: input.tier_id,
            songs: input.songs,
        }
    }
}

/// Ranking recorded for the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct RankingView {
    pub id: Uuid,
    pub tierlist_id: Uuid,
    pub created_at: String,
}

impl From<RankingEntity> for RankingView {
    fn from(ranking: RankingEntity) -> Self {
        Self {
            id: ranking.id,
            tierlist_id: ranking.tierlist_id,
            created_at: format_system_time(ranking.created_at),
        }
    }
}

/// Outcome of the caller's guesses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RankingResultView {
    /// Songs placed in the tier of the player who actually submitted them.
    pub correct: u32,
    /// Songs placed by the caller, their own songs excluded.
    pub total: u32,
    /// Whether the caller also ranked the songs by preference.
    pub ranking_submitted: bool,
}
