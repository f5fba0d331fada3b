use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GameEntity, SongEntity, SubmissionEntity, TierlistEntity, TierlistKind},
    dto::{format_system_time, submission::SubmissionView, validation::validate_label},
    state::session::SessionPhase,
};

/// Payload used to create a new game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateGameRequest {
    #[validate(custom(function = "validate_label"))]
    pub name: String,
    /// Submission deadline, in seconds since the Unix epoch.
    pub deadline: i64,
    /// Number of songs every player must submit.
    #[validate(range(min = 1, max = 5))]
    pub n_songs: u8,
}

/// Public description of a game.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameSummary {
    pub id: String,
    pub name: String,
    pub deadline: i64,
    pub n_songs: u8,
    /// Identifier of the external playlist.
    pub playlist: String,
    pub owner_id: String,
    pub created_at: String,
}

impl From<&GameEntity> for GameSummary {
    fn from(game: &GameEntity) -> Self {
        Self {
            id: game.id.clone(),
            name: game.name.clone(),
            deadline: game.deadline,
            n_songs: game.song_quota,
            playlist: game.playlist_id.clone(),
            owner_id: game.owner_id.clone(),
            created_at: format_system_time(game.created_at),
        }
    }
}

/// What a player sees when opening a game, depending on its phase.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum GameView {
    /// Before the deadline: only the caller's own submission is visible.
    Open {
        game: GameSummary,
        submission: Option<SubmissionView>,
    },
    /// After the reveal: every song and both tierlists.
    Revealed {
        game: GameSummary,
        songs: Vec<SongView>,
        guess_list: TierlistView,
        ranking_list: TierlistView,
        playlist: String,
    },
}

impl GameView {
    /// Phase this view was rendered for.
    pub fn phase(&self) -> SessionPhase {
        match self {
            GameView::Open { .. } => SessionPhase::Open,
            GameView::Revealed { .. } => SessionPhase::Revealed,
        }
    }

    /// Build the revealed payload. Songs are sorted by catalog id so their order does not
    /// hint at who submitted them.
    pub fn revealed(
        game: &GameEntity,
        submissions: &[SubmissionEntity],
        tierlists: &[TierlistEntity],
    ) -> Option<Self> {
        let mut songs: Vec<SongView> = submissions
            .iter()
            .flat_map(|submission| submission.songs.iter())
            .map(SongView::from)
            .collect();
        songs.sort_by(|a, b| a.id.cmp(&b.id));

        let drawings: HashMap<Uuid, &str> = submissions
            .iter()
            .map(|submission| (submission.id, submission.drawing.as_str()))
            .collect();
        let guess = tierlists.iter().find(|t| t.kind == TierlistKind::Guess)?;
        let ranking = tierlists.iter().find(|t| t.kind == TierlistKind::Ranking)?;

        Some(GameView::Revealed {
            game: game.into(),
            songs,
            guess_list: TierlistView::build(guess, &drawings),
            ranking_list: TierlistView::build(ranking, &drawings),
            playlist: game.playlist_id.clone(),
        })
    }
}

/// Song with the metadata attached on reveal.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SongView {
    /// Catalog identifier.
    pub id: String,
    pub name: Option<String>,
    pub cover_art: Option<String>,
}

impl From<&SongEntity> for SongView {
    fn from(song: &SongEntity) -> Self {
        Self {
            id: song.catalog_id.clone(),
            name: song.name.clone(),
            cover_art: song.cover_art.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TierlistView {
    pub id: Uuid,
    /// `guess` or `ranking`.
    pub kind: String,
    pub tiers: Vec<TierView>,
}

impl TierlistView {
    fn build(tierlist: &TierlistEntity, drawings: &HashMap<Uuid, &str>) -> Self {
        let mut tiers: Vec<TierView> = tierlist
            .tiers
            .iter()
            .map(|tier| TierView {
                id: tier.id,
                name: tier.name.clone(),
                rank: tier.rank,
                drawing: tier
                    .submission_id
                    .and_then(|id| drawings.get(&id))
                    .map(|drawing| (*drawing).to_owned()),
            })
            .collect();
        tiers.sort_by_key(|tier| tier.rank);

        Self {
            id: tierlist.id,
            kind: tierlist.kind.as_str().to_owned(),
            tiers,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TierView {
    pub id: Uuid,
    pub name: String,
    pub rank: u32,
    /// Drawing of the player a guess tier stands for.
    pub drawing: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn submission(nickname: &str, songs: &[&str]) -> SubmissionEntity {
        SubmissionEntity {
            id: Uuid::new_v4(),
            game_id: "game".into(),
            player_id: nickname.to_lowercase(),
            nickname: nickname.into(),
            drawing: format!("https://img/{nickname}"),
            songs: songs.iter().map(|id| SongEntity::bare(*id)).collect(),
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }

    #[test]
    fn revealed_view_sorts_songs_and_attaches_drawings() {
        let game = GameEntity {
            id: "game".into(),
            name: "Party".into(),
            owner_id: "owner".into(),
            deadline: 10,
            song_quota: 2,
            playlist_id: "playlist".into(),
            revealed: true,
            reveal_lease: None,
            tracks_added: false,
            created_at: SystemTime::now(),
        };
        let ace = submission("Ace", &["zzzzzzzzzzzzzzzzzzzzzz", "aaaaaaaaaaaaaaaaaaaaaa"]);
        let bob = submission("Bob", &["mmmmmmmmmmmmmmmmmmmmmm", "bbbbbbbbbbbbbbbbbbbbbb"]);
        let mut guess = TierlistEntity::guess("game");
        for (rank, sub) in [&ace, &bob].into_iter().enumerate() {
            guess.tiers.push(crate::dao::models::TierEntity {
                id: Uuid::new_v4(),
                name: sub.nickname.clone(),
                rank: rank as u32,
                submission_id: Some(sub.id),
            });
        }
        let tierlists = [guess, TierlistEntity::ranking("game")];

        let view = GameView::revealed(&game, &[ace, bob], &tierlists).unwrap();
        let GameView::Revealed {
            songs, guess_list, ranking_list, ..
        } = &view
        else {
            panic!("expected revealed view");
        };

        let ids: Vec<_> = songs.iter().map(|s| &s.id[..1]).collect();
        assert_eq!(ids, ["a", "b", "m", "z"]);
        assert_eq!(guess_list.tiers[0].drawing.as_deref(), Some("https://img/Ace"));
        assert!(ranking_list.tiers.iter().all(|t| t.drawing.is_none()));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phase"], "revealed");
        assert_eq!(json["playlist"], "playlist");
    }
}
