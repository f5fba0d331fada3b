//! BSON document shapes. Identifiers are stored as strings so filters stay plain `doc!` literals.

use mongodb::bson::{Bson, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{
    GameEntity, RankingEntity, RevealLease, SongEntity, SubmissionEntity, TierEntity,
    TierPlacementEntity, TierlistEntity, TierlistKind,
};

pub const GAME_COLLECTION: &str = "games";
pub const TIERLIST_COLLECTION: &str = "tierlists";
pub const SUBMISSION_COLLECTION: &str = "submissions";
pub const RANKING_COLLECTION: &str = "rankings";
pub const MEMBER_COLLECTION: &str = "members";

fn parse_uuid(collection: &'static str, raw: &str) -> MongoResult<Uuid> {
    Uuid::parse_str(raw).map_err(|source| MongoDaoError::Corrupt {
        collection,
        id: raw.to_owned(),
        source,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub deadline: i64,
    pub song_quota: i32,
    pub playlist_id: String,
    pub revealed: bool,
    #[serde(default)]
    pub reveal_lease: Option<LeaseDocument>,
    #[serde(default)]
    pub tracks_added: bool,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaseDocument {
    pub token: String,
    pub expires_at: i64,
}

impl From<RevealLease> for LeaseDocument {
    fn from(value: RevealLease) -> Self {
        Self {
            token: value.token.to_string(),
            expires_at: value.expires_at,
        }
    }
}

impl LeaseDocument {
    pub fn to_bson(&self) -> Bson {
        Bson::Document(doc! { "token": self.token.as_str(), "expires_at": self.expires_at })
    }
}

impl From<GameEntity> for GameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            owner_id: value.owner_id,
            deadline: value.deadline,
            song_quota: i32::from(value.song_quota),
            playlist_id: value.playlist_id,
            revealed: value.revealed,
            reveal_lease: value.reveal_lease.map(Into::into),
            tracks_added: value.tracks_added,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<GameDocument> for GameEntity {
    type Error = MongoDaoError;

    fn try_from(value: GameDocument) -> MongoResult<Self> {
        let reveal_lease = value
            .reveal_lease
            .map(|lease| {
                Ok::<_, MongoDaoError>(RevealLease {
                    token: parse_uuid(GAME_COLLECTION, &lease.token)?,
                    expires_at: lease.expires_at,
                })
            })
            .transpose()?;

        Ok(Self {
            id: value.id,
            name: value.name,
            owner_id: value.owner_id,
            deadline: value.deadline,
            song_quota: u8::try_from(value.song_quota).unwrap_or(u8::MAX),
            playlist_id: value.playlist_id,
            revealed: value.revealed,
            reveal_lease,
            tracks_added: value.tracks_added,
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierlistDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub game_id: String,
    pub kind: TierlistKind,
    pub tiers: Vec<TierDocument>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierDocument {
    pub id: String,
    pub name: String,
    pub rank: i64,
    #[serde(default)]
    pub submission_id: Option<String>,
}

impl TierDocument {
    pub fn to_document(&self) -> Document {
        doc! {
            "id": self.id.as_str(),
            "name": self.name.as_str(),
            "rank": self.rank,
            "submission_id": self.submission_id.clone(),
        }
    }
}

impl From<TierEntity> for TierDocument {
    fn from(value: TierEntity) -> Self {
        Self {
            id: value.id.to_string(),
            name: value.name,
            rank: i64::from(value.rank),
            submission_id: value.submission_id.map(|id| id.to_string()),
        }
    }
}

impl From<TierlistEntity> for TierlistDocument {
    fn from(value: TierlistEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_id: value.game_id,
            kind: value.kind,
            tiers: value.tiers.into_iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<TierlistDocument> for TierlistEntity {
    type Error = MongoDaoError;

    fn try_from(value: TierlistDocument) -> MongoResult<Self> {
        let tiers = value
            .tiers
            .into_iter()
            .map(|tier| {
                Ok(TierEntity {
                    id: parse_uuid(TIERLIST_COLLECTION, &tier.id)?,
                    name: tier.name,
                    rank: u32::try_from(tier.rank).unwrap_or_default(),
                    submission_id: tier
                        .submission_id
                        .as_deref()
                        .map(|raw| parse_uuid(TIERLIST_COLLECTION, raw))
                        .transpose()?,
                })
            })
            .collect::<MongoResult<Vec<_>>>()?;

        Ok(Self {
            id: parse_uuid(TIERLIST_COLLECTION, &value.id)?,
            game_id: value.game_id,
            kind: value.kind,
            tiers,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub game_id: String,
    pub player_id: String,
    pub nickname: String,
    pub drawing: String,
    pub songs: Vec<SongDocument>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SongDocument {
    pub catalog_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cover_art: Option<String>,
}

impl From<SubmissionEntity> for SubmissionDocument {
    fn from(value: SubmissionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_id: value.game_id,
            player_id: value.player_id,
            nickname: value.nickname,
            drawing: value.drawing,
            songs: value
                .songs
                .into_iter()
                .map(|song| SongDocument {
                    catalog_id: song.catalog_id,
                    name: song.name,
                    cover_art: song.cover_art,
                })
                .collect(),
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<SubmissionDocument> for SubmissionEntity {
    type Error = MongoDaoError;

    fn try_from(value: SubmissionDocument) -> MongoResult<Self> {
        Ok(Self {
            id: parse_uuid(SUBMISSION_COLLECTION, &value.id)?,
            game_id: value.game_id,
            player_id: value.player_id,
            nickname: value.nickname,
            drawing: value.drawing,
            songs: value
                .songs
                .into_iter()
                .map(|song| SongEntity {
                    catalog_id: song.catalog_id,
                    name: song.name,
                    cover_art: song.cover_art,
                })
                .collect(),
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub game_id: String,
    pub tierlist_id: String,
    pub player_id: String,
    pub placements: Vec<PlacementDocument>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementDocument {
    pub tier_id: String,
    pub songs: Vec<String>,
}

impl From<RankingEntity> for RankingDocument {
    fn from(value: RankingEntity) -> Self {
        Self {
            id: value.id.to_string(),
            game_id: value.game_id,
            tierlist_id: value.tierlist_id.to_string(),
            player_id: value.player_id,
            placements: value
                .placements
                .into_iter()
                .map(|placement| PlacementDocument {
                    tier_id: placement.tier_id.to_string(),
                    songs: placement.songs,
                })
                .collect(),
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<RankingDocument> for RankingEntity {
    type Error = MongoDaoError;

    fn try_from(value: RankingDocument) -> MongoResult<Self> {
        let placements = value
            .placements
            .into_iter()
            .map(|placement| {
                Ok(TierPlacementEntity {
                    tier_id: parse_uuid(RANKING_COLLECTION, &placement.tier_id)?,
                    songs: placement.songs,
                })
            })
            .collect::<MongoResult<Vec<_>>>()?;

        Ok(Self {
            id: parse_uuid(RANKING_COLLECTION, &value.id)?,
            game_id: value.game_id,
            tierlist_id: parse_uuid(RANKING_COLLECTION, &value.tierlist_id)?,
            player_id: value.player_id,
            placements,
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDocument {
    pub game_id: String,
    pub player_id: String,
    pub joined_at: DateTime,
}

pub fn doc_id(id: impl ToString) -> Document {
    doc! { "_id": id.to_string() }
}
