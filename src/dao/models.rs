use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Stable player identifier issued by the authenticator.
pub type PlayerId = String;

/// Names of the fixed tiers seeded into every ranking tierlist, best first.
pub const RANKING_TIER_NAMES: [&str; 5] = ["S", "A", "B", "C", "D"];

/// Aggregate game entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// URL-safe external identifier of the game.
    pub id: String,
    /// Display name chosen at creation.
    pub name: String,
    /// Player who created the game.
    pub owner_id: PlayerId,
    /// Submission deadline, in seconds since the Unix epoch.
    pub deadline: i64,
    /// Number of songs every submission must contain.
    pub song_quota: u8,
    /// Identifier of the external playlist filled on reveal.
    pub playlist_id: String,
    /// Whether the reveal pipeline committed for this game.
    pub revealed: bool,
    /// Claim held by the caller currently running the reveal, if any.
    pub reveal_lease: Option<RevealLease>,
    /// Set once the playlist received the submitted songs, so a later lease holder skips it.
    #[serde(default)]
    pub tracks_added: bool,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// Persisted claim on the reveal of a game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RevealLease {
    /// Token proving ownership of the claim.
    pub token: Uuid,
    /// Epoch seconds after which another caller may take the claim over.
    pub expires_at: i64,
}

/// Outcome of an attempt to claim the reveal of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealClaim {
    /// This caller owns the reveal and must run it.
    Won(RevealLease),
    /// The game was already revealed.
    Revealed,
    /// Another caller holds an unexpired lease.
    Held,
}

/// The two tierlist flavours every game owns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TierlistKind {
    /// One tier per submitting player, used to guess authorship.
    Guess,
    /// Fixed S/A/B/C/D tiers used to rank songs by preference.
    Ranking,
}

impl TierlistKind {
    /// Lowercase name used in persisted documents and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TierlistKind::Guess => "guess",
            TierlistKind::Ranking => "ranking",
        }
    }
}

/// Tierlist with its tiers embedded, ordered by rank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierlistEntity {
    pub id: Uuid,
    pub game_id: String,
    pub kind: TierlistKind,
    pub tiers: Vec<TierEntity>,
}

impl TierlistEntity {
    /// Empty guess tierlist; tiers are appended as submissions arrive.
    pub fn guess(game_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            game_id: game_id.to_owned(),
            kind: TierlistKind::Guess,
            tiers: Vec::new(),
        }
    }

    /// Ranking tierlist pre-seeded with [`RANKING_TIER_NAMES`] at ranks `0..5`.
    pub fn ranking(game_id: &str) -> Self {
        let tiers = RANKING_TIER_NAMES
            .iter()
            .enumerate()
            .map(|(rank, name)| TierEntity {
                id: Uuid::new_v4(),
                name: (*name).to_owned(),
                rank: rank as u32,
                submission_id: None,
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            game_id: game_id.to_owned(),
            kind: TierlistKind::Ranking,
            tiers,
        }
    }

    /// Rank the next appended tier should take.
    pub fn next_rank(&self) -> u32 {
        self.tiers
            .iter()
            .map(|tier| tier.rank + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Named bucket inside a tierlist. Lower rank means higher placement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierEntity {
    pub id: Uuid,
    pub name: String,
    pub rank: u32,
    /// Submission this tier stands for (guess tierlists only).
    pub submission_id: Option<Uuid>,
}

/// One player's entry into one game.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmissionEntity {
    pub id: Uuid,
    pub game_id: String,
    pub player_id: PlayerId,
    pub nickname: String,
    /// Reference to the player's drawing (URL or data URI).
    pub drawing: String,
    /// Songs in the order the player listed them.
    pub songs: Vec<SongEntity>,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

impl SubmissionEntity {
    /// Whether this submission lists `catalog_id`.
    pub fn contains_song(&self, catalog_id: &str) -> bool {
        self.songs.iter().any(|song| song.catalog_id == catalog_id)
    }
}

/// Catalog item inside a submission. Metadata is filled in on reveal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongEntity {
    pub catalog_id: String,
    pub name: Option<String>,
    pub cover_art: Option<String>,
}

impl SongEntity {
    /// Song that has not been enriched yet.
    pub fn bare(catalog_id: impl Into<String>) -> Self {
        Self {
            catalog_id: catalog_id.into(),
            name: None,
            cover_art: None,
        }
    }
}

/// Metadata written onto every matching song when the reveal commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMetadataEntity {
    pub catalog_id: String,
    pub name: Option<String>,
    pub cover_art: Option<String>,
}

/// Songs a player placed into one tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierPlacementEntity {
    pub tier_id: Uuid,
    pub songs: Vec<String>,
}

/// A player's recorded tier assignment for one tierlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankingEntity {
    pub id: Uuid,
    pub game_id: String,
    pub tierlist_id: Uuid,
    pub player_id: PlayerId,
    pub placements: Vec<TierPlacementEntity>,
    pub created_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_tierlist_is_seeded_with_fixed_tiers() {
        let tierlist = TierlistEntity::ranking("game");
        let names: Vec<_> = tierlist.tiers.iter().map(|t| t.name.as_str()).collect();
        let ranks: Vec<_> = tierlist.tiers.iter().map(|t| t.rank).collect();

        assert_eq!(tierlist.kind, TierlistKind::Ranking);
        assert_eq!(names, ["S", "A", "B", "C", "D"]);
        assert_eq!(ranks, [0, 1, 2, 3, 4]);
        assert!(tierlist.tiers.iter().all(|t| t.submission_id.is_none()));
    }

    #[test]
    fn next_rank_appends_after_highest() {
        let mut tierlist = TierlistEntity::guess("game");
        assert_eq!(tierlist.next_rank(), 0);

        tierlist.tiers.push(TierEntity {
            id: Uuid::new_v4(),
            name: "Ace".into(),
            rank: 3,
            submission_id: Some(Uuid::new_v4()),
        });
        assert_eq!(tierlist.next_rank(), 4);
    }
}
