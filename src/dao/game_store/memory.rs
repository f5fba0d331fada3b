//! Process-local storage engine used for development without MongoDB and by the test suite.
//!
//! All tables live behind one mutex so each trait method is a single atomic unit, mirroring
//! the transaction-per-operation discipline of the MongoDB engine.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::SystemTime,
};

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::dao::{
    game_store::GameStore,
    models::{
        GameEntity, PlayerId, RankingEntity, RevealClaim, RevealLease, SongMetadataEntity,
        SubmissionEntity, TierEntity, TierlistEntity, TierlistKind,
    },
    storage::{Constraint, StorageError, StorageResult},
};

#[derive(Clone, Default)]
pub struct MemoryGameStore {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Default)]
struct Tables {
    games: HashMap<String, GameEntity>,
    tierlists: HashMap<Uuid, TierlistEntity>,
    submissions: HashMap<Uuid, SubmissionEntity>,
    rankings: HashMap<Uuid, RankingEntity>,
    members: HashSet<(String, PlayerId)>,
}

impl MemoryGameStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn open_game(&self, game_id: &str, now: i64) -> StorageResult<&GameEntity> {
        let game = self
            .games
            .get(game_id)
            .ok_or_else(|| StorageError::missing("game", game_id))?;
        if game.deadline <= now {
            return Err(StorageError::SubmissionsClosed {
                game_id: game_id.to_owned(),
            });
        }
        Ok(game)
    }

    /// The unrevealed game whose lease is held by `token`.
    fn held_game_mut(&mut self, game_id: &str, token: Uuid) -> StorageResult<&mut GameEntity> {
        self.games
            .get_mut(game_id)
            .filter(|game| {
                !game.revealed && game.reveal_lease.is_some_and(|lease| lease.token == token)
            })
            .ok_or_else(|| StorageError::LeaseLost {
                game_id: game_id.to_owned(),
            })
    }

    fn guess_tierlist_mut(&mut self, game_id: &str) -> StorageResult<&mut TierlistEntity> {
        self.tierlists
            .values_mut()
            .find(|list| list.game_id == game_id && list.kind == TierlistKind::Guess)
            .ok_or_else(|| StorageError::missing("guess tierlist", game_id))
    }

    /// Apply the per-game uniqueness rules against every other submission of the game.
    fn check_submission_constraints(&self, candidate: &SubmissionEntity) -> StorageResult<()> {
        for other in self.submissions.values() {
            if other.id == candidate.id || other.game_id != candidate.game_id {
                continue;
            }
            if other.player_id == candidate.player_id {
                return Err(StorageError::Conflict(Constraint::SubmissionPerPlayer));
            }
            if other.nickname == candidate.nickname {
                return Err(StorageError::Conflict(Constraint::NicknamePerGame));
            }
            if candidate
                .songs
                .iter()
                .any(|song| other.contains_song(&song.catalog_id))
            {
                return Err(StorageError::Conflict(Constraint::SongPerGame));
            }
        }
        Ok(())
    }
}

impl GameStore for MemoryGameStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn create_game(
        &self,
        game: GameEntity,
        tierlists: [TierlistEntity; 2],
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            for tierlist in tierlists {
                tables.tierlists.insert(tierlist.id, tierlist);
            }
            tables.games.insert(game.id.clone(), game);
            Ok(())
        })
    }

    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.lock().await.games.get(&id).cloned()) })
    }

    fn delete_game(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            if tables.games.remove(&id).is_none() {
                return Ok(false);
            }
            tables.tierlists.retain(|_, list| list.game_id != id);
            tables.submissions.retain(|_, sub| sub.game_id != id);
            tables.rankings.retain(|_, ranking| ranking.game_id != id);
            tables.members.retain(|(game_id, _)| *game_id != id);
            Ok(true)
        })
    }

    fn list_tierlists(
        &self,
        game_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<TierlistEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            let mut lists: Vec<_> = tables
                .tierlists
                .values()
                .filter(|list| list.game_id == game_id)
                .cloned()
                .collect();
            lists.sort_by_key(|list| list.kind == TierlistKind::Ranking);
            Ok(lists)
        })
    }

    fn find_tierlist(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TierlistEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.lock().await.tierlists.get(&id).cloned()) })
    }

    fn find_submission(
        &self,
        game_id: String,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables
                .submissions
                .values()
                .find(|sub| sub.game_id == game_id && sub.player_id == player_id)
                .cloned())
        })
    }

    fn list_submissions(
        &self,
        game_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            let mut submissions: Vec<_> = tables
                .submissions
                .values()
                .filter(|sub| sub.game_id == game_id)
                .cloned()
                .collect();
            submissions.sort_by_key(|sub| sub.created_at);
            Ok(submissions)
        })
    }

    fn insert_submission(
        &self,
        submission: SubmissionEntity,
        now: i64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            tables.open_game(&submission.game_id, now)?;
            tables.check_submission_constraints(&submission)?;

            let guess = tables.guess_tierlist_mut(&submission.game_id)?;
            let tier = TierEntity {
                id: Uuid::new_v4(),
                name: submission.nickname.clone(),
                rank: guess.next_rank(),
                submission_id: Some(submission.id),
            };
            guess.tiers.push(tier);

            tables
                .members
                .insert((submission.game_id.clone(), submission.player_id.clone()));
            tables.submissions.insert(submission.id, submission);
            Ok(())
        })
    }

    fn update_submission(
        &self,
        submission: SubmissionEntity,
        now: i64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            tables.open_game(&submission.game_id, now)?;
            if !tables.submissions.contains_key(&submission.id) {
                return Err(StorageError::missing("submission", submission.id));
            }
            tables.check_submission_constraints(&submission)?;

            let guess = tables.guess_tierlist_mut(&submission.game_id)?;
            if let Some(tier) = guess
                .tiers
                .iter_mut()
                .find(|tier| tier.submission_id == Some(submission.id))
            {
                tier.name = submission.nickname.clone();
            }
            tables.submissions.insert(submission.id, submission);
            Ok(())
        })
    }

    fn delete_submission(
        &self,
        game_id: String,
        player_id: PlayerId,
        now: i64,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            tables.open_game(&game_id, now)?;
            let Some(id) = tables
                .submissions
                .values()
                .find(|sub| sub.game_id == game_id && sub.player_id == player_id)
                .map(|sub| sub.id)
            else {
                return Ok(false);
            };

            tables.submissions.remove(&id);
            let guess = tables.guess_tierlist_mut(&game_id)?;
            guess.tiers.retain(|tier| tier.submission_id != Some(id));
            Ok(true)
        })
    }

    fn record_member(
        &self,
        game_id: String,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            if !tables.games.contains_key(&game_id) {
                return Err(StorageError::missing("game", game_id));
            }
            tables.members.insert((game_id, player_id));
            Ok(())
        })
    }

    fn is_member(
        &self,
        game_id: String,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables.members.contains(&(game_id, player_id)))
        })
    }

    fn insert_ranking(&self, ranking: RankingEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            let belongs = tables
                .tierlists
                .get(&ranking.tierlist_id)
                .is_some_and(|list| list.game_id == ranking.game_id);
            if !belongs {
                return Err(StorageError::missing("tierlist", ranking.tierlist_id));
            }
            let member = (ranking.game_id.clone(), ranking.player_id.clone());
            if !tables.members.contains(&member) {
                return Err(StorageError::NotMember {
                    game_id: ranking.game_id,
                });
            }
            if tables.rankings.values().any(|existing| {
                existing.tierlist_id == ranking.tierlist_id
                    && existing.player_id == ranking.player_id
            }) {
                return Err(StorageError::Conflict(Constraint::RankingPerTierlist));
            }
            tables.rankings.insert(ranking.id, ranking);
            Ok(())
        })
    }

    fn count_rankings(
        &self,
        tierlist_id: Uuid,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            let count = tables
                .rankings
                .values()
                .filter(|r| r.tierlist_id == tierlist_id && r.player_id == player_id)
                .count();
            Ok(count as u64)
        })
    }

    fn find_ranking(
        &self,
        tierlist_id: Uuid,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<Option<RankingEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.lock().await;
            Ok(tables
                .rankings
                .values()
                .find(|r| r.tierlist_id == tierlist_id && r.player_id == player_id)
                .cloned())
        })
    }

    fn claim_reveal(
        &self,
        game_id: String,
        lease: RevealLease,
        now: i64,
    ) -> BoxFuture<'static, StorageResult<RevealClaim>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            let game = tables
                .games
                .get_mut(&game_id)
                .ok_or_else(|| StorageError::missing("game", &game_id))?;

            if game.revealed {
                return Ok(RevealClaim::Revealed);
            }
            if game
                .reveal_lease
                .is_some_and(|held| held.expires_at > now)
            {
                return Ok(RevealClaim::Held);
            }
            game.reveal_lease = Some(lease);
            Ok(RevealClaim::Won(lease))
        })
    }

    fn commit_reveal(
        &self,
        game_id: String,
        token: Uuid,
        metadata: Vec<SongMetadataEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            tables.held_game_mut(&game_id, token)?;

            let by_id: HashMap<_, _> = metadata
                .iter()
                .map(|meta| (meta.catalog_id.as_str(), meta))
                .collect();
            let now = SystemTime::now();
            for submission in tables
                .submissions
                .values_mut()
                .filter(|sub| sub.game_id == game_id)
            {
                for song in submission.songs.iter_mut() {
                    if let Some(meta) = by_id.get(song.catalog_id.as_str()) {
                        song.name = meta.name.clone();
                        song.cover_art = meta.cover_art.clone();
                    }
                }
                submission.updated_at = now;
            }

            if let Some(game) = tables.games.get_mut(&game_id) {
                game.revealed = true;
                game.reveal_lease = None;
            }
            Ok(())
        })
    }

    fn renew_reveal(
        &self,
        game_id: String,
        token: Uuid,
        expires_at: i64,
    ) -> BoxFuture<'static, StorageResult<GameEntity>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            let game = tables.held_game_mut(&game_id, token)?;
            game.reveal_lease = Some(RevealLease { token, expires_at });
            Ok(game.clone())
        })
    }

    fn mark_tracks_added(
        &self,
        game_id: String,
        token: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            tables.held_game_mut(&game_id, token)?.tracks_added = true;
            Ok(())
        })
    }

    fn release_reveal(
        &self,
        game_id: String,
        token: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut tables = store.tables.lock().await;
            if let Some(game) = tables.games.get_mut(&game_id) {
                if game.reveal_lease.is_some_and(|lease| lease.token == token) {
                    game.reveal_lease = None;
                }
            }
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
