//! Lazy reveal of a game once its deadline passed.
//!
//! The first reader of a locked game claims a persisted lease, enriches every submitted song
//! through the catalog, fills the external playlist and commits `revealed`. Concurrent readers
//! poll the store until the commit lands.
//!
//! The holder renews the lease before each round of catalog calls so it cannot expire while a
//! request is in flight, and the game row remembers once the playlist was filled. A caller that
//! takes over an abandoned lease therefore never adds the songs a second time.

use std::{collections::HashSet, sync::Arc};

use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    catalog::{
        TrackMetadata,
        spotify::{PLAYLIST_ADD_LIMIT, REQUEST_TIMEOUT},
    },
    dao::{
        game_store::GameStore,
        models::{GameEntity, RevealClaim, RevealLease, SongMetadataEntity, SubmissionEntity},
    },
    error::ServiceError,
    state::{
        SharedState,
        session::{SessionOperation, SessionPhase, ensure_allowed},
    },
};

/// Reveal `game` if needed and return its revealed row.
///
/// Returns [`ServiceError::RevealPending`] when another caller holds the lease for longer than
/// the configured wait.
pub async fn ensure_revealed(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    game: GameEntity,
) -> Result<GameEntity, ServiceError> {
    let phase = SessionPhase::of(&game, state.now());
    if phase == SessionPhase::Revealed {
        return Ok(game);
    }
    ensure_allowed(phase, SessionOperation::Reveal)?;

    let reveal = state.config().reveal;
    let started = Instant::now();

    loop {
        let now = state.now();
        let lease = RevealLease {
            token: Uuid::new_v4(),
            expires_at: now + reveal.lease_secs,
        };

        match store.claim_reveal(game.id.clone(), lease, now).await? {
            RevealClaim::Won(lease) => {
                run_reveal(state, store, &game, lease.token).await?;
                return reload(store, &game.id).await;
            }
            RevealClaim::Revealed => return reload(store, &game.id).await,
            RevealClaim::Held => {
                if started.elapsed() >= reveal.wait {
                    debug!(game_id = %game.id, "reveal still held by another caller");
                    return Err(ServiceError::RevealPending);
                }
                sleep(reveal.poll).await;
            }
        }
    }
}

async fn reload(store: &Arc<dyn GameStore>, game_id: &str) -> Result<GameEntity, ServiceError> {
    store
        .find_game(game_id.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))
}

/// Work done by the lease holder. Releases the lease on every failure so the next reader
/// starts over, unless another caller already took it over.
async fn run_reveal(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    game: &GameEntity,
    token: Uuid,
) -> Result<(), ServiceError> {
    let outcome = match enrich_and_publish(state, store, game, token).await {
        Ok(metadata) => store
            .commit_reveal(game.id.clone(), token, metadata)
            .await
            .map_err(ServiceError::from),
        Err(err) => Err(err),
    };

    match outcome {
        Ok(()) => {
            info!(game_id = %game.id, "game revealed");
            Ok(())
        }
        Err(ServiceError::RevealPending) => {
            warn!(game_id = %game.id, "reveal lease taken over by another caller");
            Err(ServiceError::RevealPending)
        }
        Err(err) => {
            release(store, &game.id, token).await;
            Err(err)
        }
    }
}

async fn enrich_and_publish(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    game: &GameEntity,
    token: Uuid,
) -> Result<Vec<SongMetadataEntity>, ServiceError> {
    let submissions = store.list_submissions(game.id.clone()).await?;
    let ids = collect_song_ids(&submissions);
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = state.config().metadata_batch_size;
    renew(state, store, &game.id, token, ids.len().div_ceil(batch_size)).await?;
    let mut metadata = Vec::with_capacity(ids.len());
    for batch in ids.chunks(batch_size) {
        let tracks = state.catalog().fetch_metadata(batch.to_vec()).await?;
        metadata.extend(tracks.into_iter().map(song_metadata));
    }

    let add_calls = ids.len().div_ceil(PLAYLIST_ADD_LIMIT);
    let current = renew(state, store, &game.id, token, add_calls).await?;
    if current.tracks_added {
        debug!(game_id = %game.id, "playlist already filled by an earlier lease holder");
        return Ok(metadata);
    }

    state
        .playlists()
        .add_tracks(game.playlist_id.clone(), ids.clone())
        .await?;
    store.mark_tracks_added(game.id.clone(), token).await?;
    debug!(game_id = %game.id, count = ids.len(), "playlist filled");

    Ok(metadata)
}

/// Extend the lease so it outlives the next `calls` catalog requests and return the fresh
/// game row. Fails with [`ServiceError::RevealPending`] once another caller holds the lease.
async fn renew(
    state: &SharedState,
    store: &Arc<dyn GameStore>,
    game_id: &str,
    token: Uuid,
    calls: usize,
) -> Result<GameEntity, ServiceError> {
    let window = lease_window(state.config().reveal.lease_secs, calls);
    let expires_at = state.now().saturating_add(window);
    Ok(store
        .renew_reveal(game_id.to_owned(), token, expires_at)
        .await?)
}

/// Base lease plus one request timeout per call, with one extra for a token refresh.
fn lease_window(lease_secs: i64, calls: usize) -> i64 {
    let requests = i64::try_from(calls).unwrap_or(i64::MAX).saturating_add(1);
    let timeout = i64::try_from(REQUEST_TIMEOUT.as_secs()).unwrap_or(i64::MAX);
    lease_secs.saturating_add(requests.saturating_mul(timeout))
}

async fn release(store: &Arc<dyn GameStore>, game_id: &str, token: Uuid) {
    if let Err(err) = store.release_reveal(game_id.to_owned(), token).await {
        warn!(game_id, error = %err, "failed to release reveal lease");
    }
}

/// Every catalog id across `submissions`, in first-seen order, without repeats.
fn collect_song_ids(submissions: &[SubmissionEntity]) -> Vec<String> {
    let mut seen = HashSet::new();
    submissions
        .iter()
        .flat_map(|submission| submission.songs.iter())
        .filter(|song| seen.insert(song.catalog_id.as_str()))
        .map(|song| song.catalog_id.clone())
        .collect()
}

fn song_metadata(track: TrackMetadata) -> SongMetadataEntity {
    SongMetadataEntity {
        catalog_id: track.id,
        name: track.name,
        cover_art: track.image,
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::SongEntity;

    fn submission(songs: &[&str]) -> SubmissionEntity {
        SubmissionEntity {
            id: Uuid::new_v4(),
            game_id: "game".into(),
            player_id: "p".into(),
            nickname: "n".into(),
            drawing: "d".into(),
            songs: songs.iter().map(|id| SongEntity::bare(*id)).collect(),
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
        }
    }

    #[test]
    fn lease_window_covers_every_request() {
        assert_eq!(lease_window(30, 0), 45);
        assert_eq!(lease_window(30, 2), 75);
        assert_eq!(lease_window(30, usize::MAX), i64::MAX);
    }

    #[test]
    fn song_ids_keep_first_seen_order() {
        let submissions = [submission(&["b", "a"]), submission(&["c", "a"])];
        assert_eq!(collect_song_ids(&submissions), ["b", "a", "c"]);
        assert!(collect_song_ids(&[]).is_empty());
    }
}
