//! Write-side guard in front of a [`GameStore`].
//!
//! Shape rules (lengths, formats, counts) are checked here before anything is written; rules that
//! depend on concurrently changing rows are left to the store's constraints.

use std::{collections::HashSet, sync::Arc, time::SystemTime};

use rand::{Rng, distr::Alphanumeric};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationError;

use crate::{
    clock::Clock,
    dao::{
        game_store::GameStore,
        models::{
            GameEntity, PlayerId, RankingEntity, SongEntity, SubmissionEntity,
            TierPlacementEntity, TierlistEntity,
        },
        storage::StorageError,
    },
    dto::validation::{validate_label, validate_song_list},
};

/// Length of generated game identifiers.
pub const GAME_ID_LEN: usize = 21;
/// Inclusive bounds on the number of songs per submission.
pub const SONG_QUOTA_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Result alias for validated writes.
pub type IntegrityResult<T> = Result<T, IntegrityError>;

/// Why a validated write did not happen.
#[derive(Debug, Error)]
pub enum IntegrityError {
    /// Input failed a shape rule; nothing was written.
    #[error("invalid {field}: {source}")]
    Invalid {
        field: &'static str,
        #[source]
        source: ValidationError,
    },
    /// The store refused or failed the write.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl IntegrityError {
    fn invalid(field: &'static str) -> impl FnOnce(ValidationError) -> Self {
        move |source| IntegrityError::Invalid { field, source }
    }

    fn rule(field: &'static str, code: &'static str, message: String) -> Self {
        let mut source = ValidationError::new(code);
        source.message = Some(message.into());
        IntegrityError::Invalid { field, source }
    }
}

/// Validated parameters for a new game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameDraft {
    pub name: String,
    pub owner_id: PlayerId,
    pub deadline: i64,
    pub song_quota: u8,
}

/// Player-provided content of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionDraft {
    pub nickname: String,
    pub drawing: String,
    pub songs: Vec<String>,
}

/// Generate a URL-safe random game id.
pub fn generate_game_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GAME_ID_LEN)
        .map(char::from)
        .collect()
}

/// Check the creation rules of a game and normalise its name.
pub fn check_game_draft(mut draft: GameDraft, now: i64) -> IntegrityResult<GameDraft> {
    validate_label(&draft.name).map_err(IntegrityError::invalid("name"))?;
    draft.name = draft.name.trim().to_owned();

    if !SONG_QUOTA_RANGE.contains(&draft.song_quota) {
        return Err(IntegrityError::rule(
            "n_songs",
            "song_quota_range",
            format!("Song count must be between 1 and 5 (got {})", draft.song_quota),
        ));
    }
    if draft.deadline <= now {
        return Err(IntegrityError::rule(
            "deadline",
            "deadline_past",
            "Deadline must be in the future".to_owned(),
        ));
    }
    Ok(draft)
}

/// Check a submission against the game's quota and the per-submission rules.
pub fn check_submission_draft(
    mut draft: SubmissionDraft,
    song_quota: u8,
) -> IntegrityResult<SubmissionDraft> {
    validate_label(&draft.nickname).map_err(IntegrityError::invalid("nickname"))?;
    draft.nickname = draft.nickname.trim().to_owned();

    if draft.drawing.trim().is_empty() {
        return Err(IntegrityError::rule(
            "drawing",
            "drawing_empty",
            "Drawing must not be empty".to_owned(),
        ));
    }
    if draft.songs.len() != usize::from(song_quota) {
        return Err(IntegrityError::rule(
            "songs",
            "song_count",
            format!(
                "Exactly {song_quota} song(s) required (got {})",
                draft.songs.len()
            ),
        ));
    }
    validate_song_list(&draft.songs).map_err(IntegrityError::invalid("songs"))?;
    Ok(draft)
}

/// Check that every placement targets a tier of `tierlist`, every song belongs to the game and
/// no song is placed twice.
pub fn check_placements(
    tierlist: &TierlistEntity,
    placements: &[TierPlacementEntity],
    game_songs: &HashSet<String>,
) -> IntegrityResult<()> {
    let tier_ids: HashSet<Uuid> = tierlist.tiers.iter().map(|tier| tier.id).collect();
    let mut placed = HashSet::new();

    for placement in placements {
        if !tier_ids.contains(&placement.tier_id) {
            return Err(IntegrityError::rule(
                "ranking",
                "tier_unknown",
                format!("Tier `{}` is not part of this tierlist", placement.tier_id),
            ));
        }
        for song in &placement.songs {
            if !game_songs.contains(song) {
                return Err(IntegrityError::rule(
                    "ranking",
                    "song_unknown",
                    format!("Song `{song}` was not submitted to this game"),
                ));
            }
            if !placed.insert(song.as_str()) {
                return Err(IntegrityError::rule(
                    "ranking",
                    "song_placed_twice",
                    format!("Song `{song}` is placed more than once"),
                ));
            }
        }
    }
    Ok(())
}

/// Validating facade over the raw store, used by every write path.
#[derive(Clone)]
pub struct IntegrityStore {
    store: Arc<dyn GameStore>,
    clock: Arc<dyn Clock>,
}

impl IntegrityStore {
    pub fn new(store: Arc<dyn GameStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Underlying store, for reads.
    pub fn store(&self) -> &Arc<dyn GameStore> {
        &self.store
    }

    /// Persist a validated game with its two tierlists in one atomic write.
    pub async fn create_game(
        &self,
        draft: GameDraft,
        playlist_id: String,
    ) -> IntegrityResult<GameEntity> {
        let draft = check_game_draft(draft, self.clock.now())?;
        let game = GameEntity {
            id: generate_game_id(),
            name: draft.name,
            owner_id: draft.owner_id,
            deadline: draft.deadline,
            song_quota: draft.song_quota,
            playlist_id,
            revealed: false,
            reveal_lease: None,
            tracks_added: false,
            created_at: SystemTime::now(),
        };
        let tierlists = [
            TierlistEntity::guess(&game.id),
            TierlistEntity::ranking(&game.id),
        ];

        self.store.create_game(game.clone(), tierlists).await?;
        Ok(game)
    }

    /// Insert a first submission for `player_id`.
    pub async fn insert_submission(
        &self,
        game: &GameEntity,
        player_id: PlayerId,
        draft: SubmissionDraft,
    ) -> IntegrityResult<SubmissionEntity> {
        let draft = check_submission_draft(draft, game.song_quota)?;
        let now = SystemTime::now();
        let submission = SubmissionEntity {
            id: Uuid::new_v4(),
            game_id: game.id.clone(),
            player_id,
            nickname: draft.nickname,
            drawing: draft.drawing,
            songs: draft.songs.into_iter().map(SongEntity::bare).collect(),
            created_at: now,
            updated_at: now,
        };

        self.store
            .insert_submission(submission.clone(), self.clock.now())
            .await?;
        Ok(submission)
    }

    /// Replace the content of an existing submission in place.
    pub async fn update_submission(
        &self,
        game: &GameEntity,
        existing: SubmissionEntity,
        draft: SubmissionDraft,
    ) -> IntegrityResult<SubmissionEntity> {
        let draft = check_submission_draft(draft, game.song_quota)?;
        let submission = SubmissionEntity {
            nickname: draft.nickname,
            drawing: draft.drawing,
            songs: draft.songs.into_iter().map(SongEntity::bare).collect(),
            updated_at: SystemTime::now(),
            ..existing
        };

        self.store
            .update_submission(submission.clone(), self.clock.now())
            .await?;
        Ok(submission)
    }

    /// Delete a player's submission and its guess tier.
    pub async fn withdraw_submission(
        &self,
        game_id: &str,
        player_id: PlayerId,
    ) -> IntegrityResult<bool> {
        Ok(self
            .store
            .delete_submission(game_id.to_owned(), player_id, self.clock.now())
            .await?)
    }

    /// Record a ranking whose placements have already passed [`check_placements`].
    pub async fn insert_ranking(
        &self,
        game_id: &str,
        tierlist: &TierlistEntity,
        player_id: PlayerId,
        placements: Vec<TierPlacementEntity>,
    ) -> IntegrityResult<RankingEntity> {
        let ranking = RankingEntity {
            id: Uuid::new_v4(),
            game_id: game_id.to_owned(),
            tierlist_id: tierlist.id,
            player_id,
            placements,
            created_at: SystemTime::now(),
        };

        self.store.insert_ranking(ranking.clone()).await?;
        Ok(ranking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        dao::{game_store::memory::MemoryGameStore, models::TierEntity, storage::Constraint},
    };

    const NOW: i64 = 1_700_000_000;
    const SONG_A: &str = "aaaaaaaaaaaaaaaaaaaaaa";
    const SONG_B: &str = "bbbbbbbbbbbbbbbbbbbbbb";

    fn draft(name: &str, quota: u8, deadline: i64) -> GameDraft {
        GameDraft {
            name: name.into(),
            owner_id: "owner".into(),
            deadline,
            song_quota: quota,
        }
    }

    fn entry(nickname: &str, songs: &[&str]) -> SubmissionDraft {
        SubmissionDraft {
            nickname: nickname.into(),
            drawing: "data:image/png;base64,AAAA".into(),
            songs: songs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn integrity() -> IntegrityStore {
        IntegrityStore::new(
            Arc::new(MemoryGameStore::new()),
            Arc::new(ManualClock::new(NOW)),
        )
    }

    fn field_of(err: IntegrityError) -> &'static str {
        match err {
            IntegrityError::Invalid { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn game_ids_are_url_safe() {
        let id = generate_game_id();
        assert_eq!(id.len(), GAME_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_game_id());
    }

    #[test]
    fn game_draft_bounds() {
        let ok = check_game_draft(draft("  Party  ", 2, NOW + 1), NOW).unwrap();
        assert_eq!(ok.name, "Party");

        assert_eq!(field_of(check_game_draft(draft("", 2, NOW + 1), NOW).unwrap_err()), "name");
        assert_eq!(
            field_of(check_game_draft(draft("Party", 0, NOW + 1), NOW).unwrap_err()),
            "n_songs"
        );
        assert_eq!(
            field_of(check_game_draft(draft("Party", 6, NOW + 1), NOW).unwrap_err()),
            "n_songs"
        );
        assert_eq!(
            field_of(check_game_draft(draft("Party", 2, NOW), NOW).unwrap_err()),
            "deadline"
        );
    }

    #[test]
    fn submission_draft_rules() {
        assert!(check_submission_draft(entry("Ace", &[SONG_A, SONG_B]), 2).is_ok());
        assert_eq!(
            field_of(check_submission_draft(entry("Ace", &[SONG_A]), 2).unwrap_err()),
            "songs"
        );
        assert_eq!(
            field_of(check_submission_draft(entry("Ace", &[SONG_A, SONG_A]), 2).unwrap_err()),
            "songs"
        );
        assert_eq!(
            field_of(check_submission_draft(entry("Ace", &["short", SONG_B]), 2).unwrap_err()),
            "songs"
        );
        assert_eq!(
            field_of(check_submission_draft(entry("", &[SONG_A]), 1).unwrap_err()),
            "nickname"
        );

        let mut blank = entry("Ace", &[SONG_A]);
        blank.drawing = " ".into();
        assert_eq!(field_of(check_submission_draft(blank, 1).unwrap_err()), "drawing");
    }

    #[test]
    fn placements_must_reference_tierlist_and_game() {
        let mut tierlist = TierlistEntity::guess("g");
        let tier = TierEntity {
            id: Uuid::new_v4(),
            name: "Ace".into(),
            rank: 0,
            submission_id: None,
        };
        tierlist.tiers.push(tier.clone());
        let songs: HashSet<String> = [SONG_A.to_string()].into();

        let place = |tier_id, songs: &[&str]| TierPlacementEntity {
            tier_id,
            songs: songs.iter().map(|s| s.to_string()).collect(),
        };

        assert!(check_placements(&tierlist, &[place(tier.id, &[SONG_A])], &songs).is_ok());
        assert!(check_placements(&tierlist, &[place(Uuid::new_v4(), &[SONG_A])], &songs).is_err());
        assert!(check_placements(&tierlist, &[place(tier.id, &[SONG_B])], &songs).is_err());
        assert!(
            check_placements(
                &tierlist,
                &[place(tier.id, &[SONG_A]), place(tier.id, &[SONG_A])],
                &songs
            )
            .is_err()
        );
    }

    #[tokio::test]
    async fn songs_are_unique_per_game_only() {
        let integrity = integrity();
        let first = integrity
            .create_game(draft("First", 2, NOW + 3600), "p1".into())
            .await
            .unwrap();
        let second = integrity
            .create_game(draft("Second", 1, NOW + 3600), "p2".into())
            .await
            .unwrap();

        integrity
            .insert_submission(&first, "alice".into(), entry("Ace", &[SONG_A, SONG_B]))
            .await
            .unwrap();
        integrity
            .insert_submission(&second, "bob".into(), entry("Bee", &[SONG_A]))
            .await
            .unwrap();

        let err = integrity
            .insert_submission(&first, "bob".into(), entry("Bee", &[SONG_A, "cccccccccccccccccccccc"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IntegrityError::Storage(StorageError::Conflict(Constraint::SongPerGame))
        ));
    }

    #[tokio::test]
    async fn update_keeps_identity_and_renames_tier() {
        let integrity = integrity();
        let game = integrity
            .create_game(draft("Party", 1, NOW + 3600), "p".into())
            .await
            .unwrap();
        let created = integrity
            .insert_submission(&game, "alice".into(), entry("Ace", &[SONG_A]))
            .await
            .unwrap();
        let updated = integrity
            .update_submission(&game, created.clone(), entry("Queen", &[SONG_B]))
            .await
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);

        let lists = integrity.store().list_tierlists(game.id.clone()).await.unwrap();
        let tier = &lists[0].tiers[0];
        assert_eq!(tier.name, "Queen");
        assert_eq!(tier.rank, 0);
        assert_eq!(tier.submission_id, Some(created.id));
    }
}
