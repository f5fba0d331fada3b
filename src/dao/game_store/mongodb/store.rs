use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, ClientSession, Collection, Database, IndexModel,
    bson::{DateTime, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{
        MongoDaoError, MongoResult, RANKING_PLAYER_INDEX, SUBMISSION_NICKNAME_INDEX,
        SUBMISSION_PLAYER_INDEX, SUBMISSION_SONG_INDEX,
    },
    models::{
        GAME_COLLECTION, GameDocument, LeaseDocument, MEMBER_COLLECTION, MemberDocument,
        RANKING_COLLECTION, RankingDocument, SUBMISSION_COLLECTION, SubmissionDocument,
        TIERLIST_COLLECTION, TierDocument, TierlistDocument, doc_id,
    },
};
use crate::dao::{
    game_store::GameStore,
    models::{
        GameEntity, PlayerId, RankingEntity, RevealClaim, RevealLease, SongMetadataEntity,
        SubmissionEntity, TierEntity, TierlistEntity, TierlistKind,
    },
    storage::{StorageError, StorageResult},
};

const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

/// MongoDB-backed [`GameStore`]. Multi-document writes run inside transactions, so the
/// deployment must be a replica set.
#[derive(Clone)]
pub struct MongoGameStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

/// Close a transaction according to the outcome of its body.
async fn finish_transaction<T>(
    session: &mut ClientSession,
    outcome: MongoResult<T>,
) -> MongoResult<T> {
    match outcome {
        Ok(value) => {
            session
                .commit_transaction()
                .await
                .map_err(|source| MongoDaoError::Transaction { source })?;
            Ok(value)
        }
        Err(err) => {
            if let Err(abort_err) = session.abort_transaction().await {
                debug!(error = %abort_err, "failed to abort MongoDB transaction");
            }
            Err(err)
        }
    }
}

fn now_bson() -> DateTime {
    DateTime::from_system_time(SystemTime::now())
}

impl MongoGameStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        let indexes: [(&'static str, &'static str, Document); 5] = [
            (
                SUBMISSION_COLLECTION,
                SUBMISSION_PLAYER_INDEX,
                doc! { "game_id": 1, "player_id": 1 },
            ),
            (
                SUBMISSION_COLLECTION,
                SUBMISSION_NICKNAME_INDEX,
                doc! { "game_id": 1, "nickname": 1 },
            ),
            (
                SUBMISSION_COLLECTION,
                SUBMISSION_SONG_INDEX,
                doc! { "game_id": 1, "songs.catalog_id": 1 },
            ),
            (
                RANKING_COLLECTION,
                RANKING_PLAYER_INDEX,
                doc! { "tierlist_id": 1, "player_id": 1 },
            ),
            (
                MEMBER_COLLECTION,
                "member_idx",
                doc! { "game_id": 1, "player_id": 1 },
            ),
        ];

        for (collection, index, keys) in indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(index.to_owned()))
                        .unique(Some(true))
                        .build(),
                )
                .build();
            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index,
                    source,
                })?;
        }

        let tierlist_index = IndexModel::builder()
            .keys(doc! { "game_id": 1, "kind": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("tierlist_game_idx".to_owned()))
                    .build(),
            )
            .build();
        database
            .collection::<Document>(TIERLIST_COLLECTION)
            .create_index(tierlist_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: TIERLIST_COLLECTION,
                index: "tierlist_game_idx",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        self.inner.state.read().await.database.clone()
    }

    async fn games(&self) -> Collection<GameDocument> {
        self.database().await.collection(GAME_COLLECTION)
    }

    async fn tierlists(&self) -> Collection<TierlistDocument> {
        self.database().await.collection(TIERLIST_COLLECTION)
    }

    async fn submissions(&self) -> Collection<SubmissionDocument> {
        self.database().await.collection(SUBMISSION_COLLECTION)
    }

    async fn rankings(&self) -> Collection<RankingDocument> {
        self.database().await.collection(RANKING_COLLECTION)
    }

    async fn members(&self) -> Collection<MemberDocument> {
        self.database().await.collection(MEMBER_COLLECTION)
    }

    async fn start_transaction(&self) -> MongoResult<ClientSession> {
        let client = self.inner.state.read().await.client.clone();
        let mut session = client
            .start_session()
            .await
            .map_err(|source| MongoDaoError::Transaction { source })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction { source })?;
        Ok(session)
    }

    /// Run `body` inside a transaction, retrying from scratch on transient failures such as
    /// write conflicts between concurrent transactions.
    async fn in_transaction<T, F>(&self, mut body: F) -> MongoResult<T>
    where
        F: for<'s> FnMut(&'s mut ClientSession) -> BoxFuture<'s, MongoResult<T>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut session = self.start_transaction().await?;
            let outcome = body(&mut session).await;
            match finish_transaction(&mut session, outcome).await {
                Err(err) if err.is_transient() && attempts < MAX_TRANSACTION_ATTEMPTS => {
                    warn!(error = %err, attempts, "retrying MongoDB transaction");
                }
                result => return result,
            }
        }
    }

    /// Load the game inside `session` and check that its deadline is after `now`.
    async fn require_open_game(
        &self,
        session: &mut ClientSession,
        game_id: &str,
        now: i64,
    ) -> MongoResult<()> {
        let game = self
            .games()
            .await
            .find_one(doc_id(game_id))
            .session(&mut *session)
            .await
            .map_err(MongoDaoError::operation("load game", GAME_COLLECTION))?
            .ok_or_else(|| MongoDaoError::Rejected(StorageError::missing("game", game_id)))?;

        if game.deadline <= now {
            return Err(MongoDaoError::Rejected(StorageError::SubmissionsClosed {
                game_id: game_id.to_owned(),
            }));
        }
        Ok(())
    }

    async fn record_member_in(
        &self,
        session: &mut ClientSession,
        game_id: &str,
        player_id: &str,
    ) -> MongoResult<()> {
        self.members()
            .await
            .update_one(
                doc! { "game_id": game_id, "player_id": player_id },
                doc! { "$setOnInsert": { "joined_at": now_bson() } },
            )
            .upsert(true)
            .session(&mut *session)
            .await
            .map_err(MongoDaoError::operation("record member", MEMBER_COLLECTION))?;
        Ok(())
    }

    async fn create_game(&self, game: GameEntity, tierlists: [TierlistEntity; 2]) -> MongoResult<()> {
        let game: GameDocument = game.into();
        let tierlists: Vec<TierlistDocument> = tierlists.into_iter().map(Into::into).collect();
        self.in_transaction(|session| {
            let store = self.clone();
            let game = game.clone();
            let tierlists = tierlists.clone();
            Box::pin(async move {
                store
                    .games()
                    .await
                    .insert_one(&game)
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::write("insert game", GAME_COLLECTION))?;
                store
                    .tierlists()
                    .await
                    .insert_many(&tierlists)
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::write("insert tierlists", TIERLIST_COLLECTION))?;
                Ok(())
            })
        })
        .await
    }

    async fn find_game(&self, id: &str) -> MongoResult<Option<GameEntity>> {
        self.games()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(MongoDaoError::operation("load game", GAME_COLLECTION))?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn delete_game(&self, id: String) -> MongoResult<bool> {
        self.in_transaction(|session| {
            let store = self.clone();
            let id = id.clone();
            Box::pin(async move {
                let deleted = store
                    .games()
                    .await
                    .delete_one(doc_id(&id))
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::operation("delete game", GAME_COLLECTION))?;
                if deleted.deleted_count == 0 {
                    return Ok(false);
                }

                let database = store.database().await;
                for collection in [
                    TIERLIST_COLLECTION,
                    SUBMISSION_COLLECTION,
                    RANKING_COLLECTION,
                    MEMBER_COLLECTION,
                ] {
                    database
                        .collection::<Document>(collection)
                        .delete_many(doc! { "game_id": id.as_str() })
                        .session(&mut *session)
                        .await
                        .map_err(MongoDaoError::operation("cascade game delete", collection))?;
                }
                Ok(true)
            })
        })
        .await
    }

    async fn list_tierlists(&self, game_id: &str) -> MongoResult<Vec<TierlistEntity>> {
        let documents: Vec<TierlistDocument> = self
            .tierlists()
            .await
            .find(doc! { "game_id": game_id })
            .await
            .map_err(MongoDaoError::operation("list tierlists", TIERLIST_COLLECTION))?
            .try_collect()
            .await
            .map_err(MongoDaoError::operation("list tierlists", TIERLIST_COLLECTION))?;

        let mut lists = documents
            .into_iter()
            .map(TryInto::try_into)
            .collect::<MongoResult<Vec<TierlistEntity>>>()?;
        lists.sort_by_key(|list| list.kind == TierlistKind::Ranking);
        Ok(lists)
    }

    async fn find_tierlist(&self, id: Uuid) -> MongoResult<Option<TierlistEntity>> {
        self.tierlists()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(MongoDaoError::operation("load tierlist", TIERLIST_COLLECTION))?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn find_submission(
        &self,
        game_id: &str,
        player_id: &str,
    ) -> MongoResult<Option<SubmissionEntity>> {
        self.submissions()
            .await
            .find_one(doc! { "game_id": game_id, "player_id": player_id })
            .await
            .map_err(MongoDaoError::operation("load submission", SUBMISSION_COLLECTION))?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn list_submissions(&self, game_id: &str) -> MongoResult<Vec<SubmissionEntity>> {
        let documents: Vec<SubmissionDocument> = self
            .submissions()
            .await
            .find(doc! { "game_id": game_id })
            .sort(doc! { "created_at": 1 })
            .await
            .map_err(MongoDaoError::operation("list submissions", SUBMISSION_COLLECTION))?
            .try_collect()
            .await
            .map_err(MongoDaoError::operation("list submissions", SUBMISSION_COLLECTION))?;

        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn insert_submission(&self, submission: SubmissionEntity, now: i64) -> MongoResult<()> {
        self.in_transaction(|session| {
            let store = self.clone();
            let submission = submission.clone();
            Box::pin(async move {
                let game_id = submission.game_id.clone();
                store.require_open_game(session, &game_id, now).await?;

                let document: SubmissionDocument = submission.clone().into();
                store
                    .submissions()
                    .await
                    .insert_one(&document)
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::write("insert submission", SUBMISSION_COLLECTION))?;

                let tierlists = store.tierlists().await;
                let guess: TierlistEntity = tierlists
                    .find_one(doc! { "game_id": game_id.as_str(), "kind": TierlistKind::Guess.as_str() })
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::operation("load tierlist", TIERLIST_COLLECTION))?
                    .ok_or_else(|| {
                        MongoDaoError::Rejected(StorageError::missing("guess tierlist", &game_id))
                    })?
                    .try_into()?;

                let tier = TierDocument::from(TierEntity {
                    id: Uuid::new_v4(),
                    name: submission.nickname.clone(),
                    rank: guess.next_rank(),
                    submission_id: Some(submission.id),
                });
                tierlists
                    .update_one(
                        doc_id(guess.id),
                        doc! { "$push": { "tiers": tier.to_document() } },
                    )
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::operation("append tier", TIERLIST_COLLECTION))?;

                store
                    .record_member_in(session, &game_id, &submission.player_id)
                    .await
            })
        })
        .await
    }

    async fn update_submission(&self, submission: SubmissionEntity, now: i64) -> MongoResult<()> {
        self.in_transaction(|session| {
            let store = self.clone();
            let submission = submission.clone();
            Box::pin(async move {
                store
                    .require_open_game(session, &submission.game_id, now)
                    .await?;

                let id = submission.id;
                let document: SubmissionDocument = submission.clone().into();
                let replaced = store
                    .submissions()
                    .await
                    .replace_one(doc_id(id), &document)
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::write("replace submission", SUBMISSION_COLLECTION))?;
                if replaced.matched_count == 0 {
                    return Err(MongoDaoError::Rejected(StorageError::missing(
                        "submission",
                        id,
                    )));
                }

                store
                    .tierlists()
                    .await
                    .update_one(
                        doc! {
                            "game_id": submission.game_id.as_str(),
                            "kind": TierlistKind::Guess.as_str(),
                            "tiers.submission_id": id.to_string(),
                        },
                        doc! { "$set": { "tiers.$.name": submission.nickname.as_str() } },
                    )
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::operation("rename tier", TIERLIST_COLLECTION))?;
                Ok(())
            })
        })
        .await
    }

    async fn delete_submission(
        &self,
        game_id: String,
        player_id: PlayerId,
        now: i64,
    ) -> MongoResult<bool> {
        self.in_transaction(|session| {
            let store = self.clone();
            let game_id = game_id.clone();
            let player_id = player_id.clone();
            Box::pin(async move {
                store.require_open_game(session, &game_id, now).await?;

                let Some(removed) = store
                    .submissions()
                    .await
                    .find_one_and_delete(
                        doc! { "game_id": game_id.as_str(), "player_id": player_id.as_str() },
                    )
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::operation("delete submission", SUBMISSION_COLLECTION))?
                else {
                    return Ok(false);
                };

                store
                    .tierlists()
                    .await
                    .update_one(
                        doc! { "game_id": game_id.as_str(), "kind": TierlistKind::Guess.as_str() },
                        doc! { "$pull": { "tiers": { "submission_id": removed.id.as_str() } } },
                    )
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::operation("remove tier", TIERLIST_COLLECTION))?;
                Ok(true)
            })
        })
        .await
    }

    async fn record_member(&self, game_id: String, player_id: PlayerId) -> MongoResult<()> {
        if self.find_game(&game_id).await?.is_none() {
            return Err(MongoDaoError::Rejected(StorageError::missing(
                "game", game_id,
            )));
        }

        match self
            .members()
            .await
            .update_one(
                doc! { "game_id": game_id.as_str(), "player_id": player_id.as_str() },
                doc! { "$setOnInsert": { "joined_at": now_bson() } },
            )
            .upsert(true)
            .await
            .map_err(MongoDaoError::write("record member", MEMBER_COLLECTION))
        {
            // Two concurrent first visits race on the unique index; either row is the same.
            Ok(_) | Err(MongoDaoError::Rejected(StorageError::Conflict(_))) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn is_member(&self, game_id: &str, player_id: &str) -> MongoResult<bool> {
        let member = self
            .members()
            .await
            .find_one(doc! { "game_id": game_id, "player_id": player_id })
            .await
            .map_err(MongoDaoError::operation("load member", MEMBER_COLLECTION))?;
        Ok(member.is_some())
    }

    async fn insert_ranking(&self, ranking: RankingEntity) -> MongoResult<()> {
        self.in_transaction(|session| {
            let store = self.clone();
            let ranking = ranking.clone();
            Box::pin(async move {
                let owned = store
                    .tierlists()
                    .await
                    .find_one(doc! {
                        "_id": ranking.tierlist_id.to_string(),
                        "game_id": ranking.game_id.as_str(),
                    })
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::operation("load tierlist", TIERLIST_COLLECTION))?;
                if owned.is_none() {
                    return Err(MongoDaoError::Rejected(StorageError::missing(
                        "tierlist",
                        ranking.tierlist_id,
                    )));
                }

                let member = store
                    .members()
                    .await
                    .find_one(doc! {
                        "game_id": ranking.game_id.as_str(),
                        "player_id": ranking.player_id.as_str(),
                    })
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::operation("load member", MEMBER_COLLECTION))?;
                if member.is_none() {
                    return Err(MongoDaoError::Rejected(StorageError::NotMember {
                        game_id: ranking.game_id.clone(),
                    }));
                }

                let document: RankingDocument = ranking.into();
                store
                    .rankings()
                    .await
                    .insert_one(&document)
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::write("insert ranking", RANKING_COLLECTION))?;
                Ok(())
            })
        })
        .await
    }

    async fn count_rankings(&self, tierlist_id: Uuid, player_id: &str) -> MongoResult<u64> {
        self.rankings()
            .await
            .count_documents(doc! { "tierlist_id": tierlist_id.to_string(), "player_id": player_id })
            .await
            .map_err(MongoDaoError::operation("count rankings", RANKING_COLLECTION))
    }

    async fn find_ranking(
        &self,
        tierlist_id: Uuid,
        player_id: &str,
    ) -> MongoResult<Option<RankingEntity>> {
        self.rankings()
            .await
            .find_one(doc! { "tierlist_id": tierlist_id.to_string(), "player_id": player_id })
            .await
            .map_err(MongoDaoError::operation("load ranking", RANKING_COLLECTION))?
            .map(TryInto::try_into)
            .transpose()
    }

    async fn claim_reveal(
        &self,
        game_id: &str,
        lease: RevealLease,
        now: i64,
    ) -> MongoResult<RevealClaim> {
        let games = self.games().await;
        let lease_doc = LeaseDocument::from(lease);
        let claimed = games
            .find_one_and_update(
                doc! {
                    "_id": game_id,
                    "revealed": false,
                    "$or": [
                        { "reveal_lease": null },
                        { "reveal_lease.expires_at": { "$lte": now } },
                    ],
                },
                doc! { "$set": { "reveal_lease": lease_doc.to_bson() } },
            )
            .await
            .map_err(MongoDaoError::operation("claim reveal", GAME_COLLECTION))?;
        if claimed.is_some() {
            return Ok(RevealClaim::Won(lease));
        }

        match self.find_game(game_id).await? {
            None => Err(MongoDaoError::Rejected(StorageError::missing("game", game_id))),
            Some(game) if game.revealed => Ok(RevealClaim::Revealed),
            Some(_) => Ok(RevealClaim::Held),
        }
    }

    async fn commit_reveal(
        &self,
        game_id: String,
        token: Uuid,
        metadata: Vec<SongMetadataEntity>,
    ) -> MongoResult<()> {
        self.in_transaction(|session| {
            let store = self.clone();
            let game_id = game_id.clone();
            let metadata = metadata.clone();
            Box::pin(async move {
                let flipped = store
                    .games()
                    .await
                    .update_one(
                        Self::lease_filter(&game_id, token),
                        doc! { "$set": { "revealed": true, "reveal_lease": null } },
                    )
                    .session(&mut *session)
                    .await
                    .map_err(MongoDaoError::operation("commit reveal", GAME_COLLECTION))?;
                if flipped.matched_count == 0 {
                    return Err(MongoDaoError::Rejected(StorageError::LeaseLost { game_id }));
                }

                let submissions = store.submissions().await;
                let updated_at = now_bson();
                for song in metadata {
                    submissions
                        .update_many(
                            doc! {
                                "game_id": game_id.as_str(),
                                "songs.catalog_id": song.catalog_id.as_str(),
                            },
                            doc! { "$set": {
                                "songs.$.name": song.name,
                                "songs.$.cover_art": song.cover_art,
                                "updated_at": updated_at,
                            } },
                        )
                        .session(&mut *session)
                        .await
                        .map_err(MongoDaoError::operation(
                            "store song metadata",
                            SUBMISSION_COLLECTION,
                        ))?;
                }
                Ok(())
            })
        })
        .await
    }

    fn lease_filter(game_id: &str, token: Uuid) -> Document {
        doc! {
            "_id": game_id,
            "revealed": false,
            "reveal_lease.token": token.to_string(),
        }
    }

    async fn renew_reveal(
        &self,
        game_id: &str,
        token: Uuid,
        expires_at: i64,
    ) -> MongoResult<GameEntity> {
        self.games()
            .await
            .find_one_and_update(
                Self::lease_filter(game_id, token),
                doc! { "$set": { "reveal_lease.expires_at": expires_at } },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(MongoDaoError::operation("renew reveal", GAME_COLLECTION))?
            .ok_or_else(|| {
                MongoDaoError::Rejected(StorageError::LeaseLost {
                    game_id: game_id.to_owned(),
                })
            })?
            .try_into()
    }

    async fn mark_tracks_added(&self, game_id: &str, token: Uuid) -> MongoResult<()> {
        let marked = self
            .games()
            .await
            .update_one(
                Self::lease_filter(game_id, token),
                doc! { "$set": { "tracks_added": true } },
            )
            .await
            .map_err(MongoDaoError::operation("mark tracks added", GAME_COLLECTION))?;
        if marked.matched_count == 0 {
            return Err(MongoDaoError::Rejected(StorageError::LeaseLost {
                game_id: game_id.to_owned(),
            }));
        }
        Ok(())
    }

    async fn release_reveal(&self, game_id: &str, token: Uuid) -> MongoResult<()> {
        self.games()
            .await
            .update_one(
                doc! { "_id": game_id, "reveal_lease.token": token.to_string() },
                doc! { "$set": { "reveal_lease": null } },
            )
            .await
            .map_err(MongoDaoError::operation("release reveal", GAME_COLLECTION))?;
        Ok(())
    }
}

impl GameStore for MongoGameStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    fn create_game(
        &self,
        game: GameEntity,
        tierlists: [TierlistEntity; 2],
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_game(game, tierlists).await.map_err(Into::into) })
    }

    fn find_game(&self, id: String) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(&id).await.map_err(Into::into) })
    }

    fn delete_game(&self, id: String) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.delete_game(id).await.map_err(Into::into) })
    }

    fn list_tierlists(
        &self,
        game_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<TierlistEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_tierlists(&game_id).await.map_err(Into::into) })
    }

    fn find_tierlist(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<TierlistEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_tierlist(id).await.map_err(Into::into) })
    }

    fn find_submission(
        &self,
        game_id: String,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<Option<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_submission(&game_id, &player_id)
                .await
                .map_err(Into::into)
        })
    }

    fn list_submissions(
        &self,
        game_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<SubmissionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_submissions(&game_id).await.map_err(Into::into) })
    }

    fn insert_submission(
        &self,
        submission: SubmissionEntity,
        now: i64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .insert_submission(submission, now)
                .await
                .map_err(Into::into)
        })
    }

    fn update_submission(
        &self,
        submission: SubmissionEntity,
        now: i64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_submission(submission, now)
                .await
                .map_err(Into::into)
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
            store
                .delete_submission(game_id, player_id, now)
                .await
                .map_err(Into::into)
        })
    }

    fn record_member(
        &self,
        game_id: String,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .record_member(game_id, player_id)
                .await
                .map_err(Into::into)
        })
    }

    fn is_member(
        &self,
        game_id: String,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .is_member(&game_id, &player_id)
                .await
                .map_err(Into::into)
        })
    }

    fn insert_ranking(&self, ranking: RankingEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_ranking(ranking).await.map_err(Into::into) })
    }

    fn count_rankings(
        &self,
        tierlist_id: Uuid,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .count_rankings(tierlist_id, &player_id)
                .await
                .map_err(Into::into)
        })
    }

    fn find_ranking(
        &self,
        tierlist_id: Uuid,
        player_id: PlayerId,
    ) -> BoxFuture<'static, StorageResult<Option<RankingEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_ranking(tierlist_id, &player_id)
                .await
                .map_err(Into::into)
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
            store
                .claim_reveal(&game_id, lease, now)
                .await
                .map_err(Into::into)
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
            store
                .commit_reveal(game_id, token, metadata)
                .await
                .map_err(Into::into)
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
            store
                .renew_reveal(&game_id, token, expires_at)
                .await
                .map_err(Into::into)
        })
    }

    fn mark_tracks_added(
        &self,
        game_id: String,
        token: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .mark_tracks_added(&game_id, token)
                .await
                .map_err(Into::into)
        })
    }

    fn release_reveal(
        &self,
        game_id: String,
        token: Uuid,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .release_reveal(&game_id, token)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
