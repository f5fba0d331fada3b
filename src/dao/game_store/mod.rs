pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    GameEntity, PlayerId, RankingEntity, RevealClaim, RevealLease, SongMetadataEntity,
    SubmissionEntity, TierlistEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for games and everything they own.
///
/// Every write is one atomic unit and enforces the uniqueness rules listed in
/// [`Constraint`](crate::dao::storage::Constraint), so two racing writers cannot both succeed.
/// Callers validate input shape before reaching the store; the store only guards what needs
/// to be checked against concurrently changing data.
pub trait GameStore: Send + Sync {
    /// Short name of the engine, reported by the health check.
    fn backend(&self) -> &'static str;

    /// Persist a game together with its guess and ranking tierlists.
    fn create_game(
        &self,
        game: GameEntity,
        tierlists: [TierlistEntity; 2],
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Load a game by identifier.
    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    /// Delete a game and cascade to tierlists, submissions, rankings and memberships.
    fn delete_game(&self, id: String) -> BoxFuture<'static, StorageResult<bool>>;

    /// Both tierlists of a game, guess first.
    fn list_tierlists(
        &self,
        game_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<TierlistEntity>>>;
    /// Load a tierlist by identifier.
    fn find_tierlist(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TierlistEntity>>>;

    /// The submission of `player_id` in a game, if any.
    fn find_submission(
        &self,
        game_id: String,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>>;
    /// Every submission of a game, oldest first.
    fn list_submissions(
        &self,
        game_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>>;
    /// Insert a submission, append its guess tier and record the player's membership.
    ///
    /// Fails with `SubmissionsClosed` when the game deadline is not after `now`.
    fn insert_submission(
        &self,
        submission: SubmissionEntity,
        now: i64,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Replace the nickname, drawing and songs of an existing submission and rename its tier.
    fn update_submission(
        &self,
        submission: SubmissionEntity,
        now: i64,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Remove a player's submission and its guess tier. Returns `false` when none existed.
    fn delete_submission(
        &self,
        game_id: String,
        player_id: PlayerId,
        now: i64,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Record that a player interacted with a game. Idempotent.
    fn record_member(
        &self,
        game_id: String,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Whether the player submitted to, or otherwise joined, the game.
    fn is_member(&self, game_id: String, player_id: PlayerId)
    -> BoxFuture<'static, StorageResult<bool>>;

    /// Insert a ranking after checking tierlist ownership and membership.
    fn insert_ranking(&self, ranking: RankingEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Number of rankings a player stored against a tierlist.
    fn count_rankings(
        &self,
        tierlist_id: Uuid,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<u64>>;
    /// The ranking a player stored against a tierlist, if any.
    fn find_ranking(
        &self,
        tierlist_id: Uuid,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<Option<RankingEntity>>>;

    /// Conditionally take the reveal lease: only succeeds while the game is unrevealed and
    /// no unexpired lease is held.
    fn claim_reveal(
        &self,
        game_id: String,
        lease: RevealLease,
        now: i64,
    ) -> BoxFuture<'static, StorageResult<RevealClaim>>;
    /// Write song metadata and flip `revealed`, provided `token` still holds the lease.
    fn commit_reveal(
        &self,
        game_id: String,
        token: Uuid,
        metadata: Vec<SongMetadataEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Push the expiry of a held lease to `expires_at` and return the game row.
    ///
    /// Fails with `LeaseLost` once `token` no longer holds the lease.
    fn renew_reveal(
        &self,
        game_id: String,
        token: Uuid,
        expires_at: i64,
    ) -> BoxFuture<'static, StorageResult<GameEntity>>;
    /// Record that the playlist was filled, provided `token` still holds the lease.
    fn mark_tracks_added(
        &self,
        game_id: String,
        token: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Drop the lease without revealing so a later reader retries.
    fn release_reveal(&self, game_id: String, token: Uuid)
    -> BoxFuture<'static, StorageResult<()>>;

    /// Cheap round trip proving the engine is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rebuild the underlying connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
