use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{
        game_store::GameStore,
        integrity::check_placements,
        models::{PlayerId, RankingEntity, SubmissionEntity, TierlistEntity, TierlistKind},
    },
    dto::ranking::{RankingRequest, RankingResultView, RankingView},
    error::ServiceError,
    services::game_service::load_game,
    state::{
        SharedState,
        session::{SessionOperation, SessionPhase, ensure_allowed},
    },
};

/// Record the caller's tier assignment for one tierlist of a revealed game.
///
/// Checks run in a fixed order: game, phase, tierlist, placements, membership, precedence,
/// then the store's uniqueness rule.
pub async fn submit_ranking(
    state: &SharedState,
    player: PlayerId,
    game_id: String,
    request: RankingRequest,
) -> Result<RankingView, ServiceError> {
    let integrity = state.require_integrity().await?;
    let store = integrity.store().clone();
    let game = load_game(&store, &game_id).await?;
    ensure_allowed(SessionPhase::of(&game, state.now()), SessionOperation::Rank)?;

    let tierlist = store
        .find_tierlist(request.tierlist_id)
        .await?
        .filter(|tierlist| tierlist.game_id == game.id)
        .ok_or_else(|| {
            ServiceError::NotFound(format!("tierlist `{}` not found", request.tierlist_id))
        })?;

    let submissions = store.list_submissions(game.id.clone()).await?;
    let game_songs: HashSet<String> = submissions
        .iter()
        .flat_map(|submission| submission.songs.iter())
        .map(|song| song.catalog_id.clone())
        .collect();
    let placements: Vec<_> = request.ranking.into_iter().map(Into::into).collect();
    check_placements(&tierlist, &placements, &game_songs)?;

    if !store.is_member(game.id.clone(), player.clone()).await? {
        return Err(ServiceError::Forbidden(format!(
            "player is not a participant of game `{}`",
            game.id
        )));
    }

    if tierlist.kind == TierlistKind::Ranking {
        let guess = guess_tierlist(&store, &game.id).await?;
        if store.count_rankings(guess.id, player.clone()).await? == 0 {
            return Err(ServiceError::Precedence(
                "submit the guess tierlist before ranking songs".into(),
            ));
        }
    }

    let ranking = integrity
        .insert_ranking(&game.id, &tierlist, player, placements)
        .await?;
    info!(
        game_id = %game.id,
        tierlist = tierlist.kind.as_str(),
        ranking_id = %ranking.id,
        "ranking recorded"
    );
    Ok(ranking.into())
}

/// Score the caller's guesses and report whether they ranked the songs too.
pub async fn ranking_result(
    state: &SharedState,
    player: PlayerId,
    game_id: String,
) -> Result<RankingResultView, ServiceError> {
    let store = state.require_game_store().await?;
    let game = load_game(&store, &game_id).await?;
    ensure_allowed(SessionPhase::of(&game, state.now()), SessionOperation::Rank)?;

    let tierlists = store.list_tierlists(game.id.clone()).await?;
    let guess = find_kind(&tierlists, TierlistKind::Guess, &game.id)?;
    let ranking_list = find_kind(&tierlists, TierlistKind::Ranking, &game.id)?;

    let Some(guess_ranking) = store.find_ranking(guess.id, player.clone()).await? else {
        return Err(ServiceError::Precedence(
            "no guess submitted for this game yet".into(),
        ));
    };
    let ranking_submitted = store.count_rankings(ranking_list.id, player.clone()).await? > 0;

    let submissions = store.list_submissions(game.id.clone()).await?;
    let (correct, total) = score_guess(guess, &guess_ranking, &submissions, &player);

    Ok(RankingResultView {
        correct,
        total,
        ranking_submitted,
    })
}

async fn guess_tierlist(
    store: &Arc<dyn GameStore>,
    game_id: &str,
) -> Result<TierlistEntity, ServiceError> {
    let tierlists = store.list_tierlists(game_id.to_owned()).await?;
    find_kind(&tierlists, TierlistKind::Guess, game_id).cloned()
}

fn find_kind<'a>(
    tierlists: &'a [TierlistEntity],
    kind: TierlistKind,
    game_id: &str,
) -> Result<&'a TierlistEntity, ServiceError> {
    tierlists
        .iter()
        .find(|tierlist| tierlist.kind == kind)
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "{} tierlist of game `{game_id}` not found",
                kind.as_str()
            ))
        })
}

/// Count placed songs that sit in the tier of their actual submitter. The caller's own songs
/// are left out of both counts.
fn score_guess(
    guess: &TierlistEntity,
    ranking: &RankingEntity,
    submissions: &[SubmissionEntity],
    player: &str,
) -> (u32, u32) {
    let by_id: HashMap<Uuid, &SubmissionEntity> = submissions
        .iter()
        .map(|submission| (submission.id, submission))
        .collect();
    let owner_of_tier: HashMap<Uuid, Option<&SubmissionEntity>> = guess
        .tiers
        .iter()
        .map(|tier| (tier.id, tier.submission_id.and_then(|id| by_id.get(&id).copied())))
        .collect();
    let own = submissions.iter().find(|s| s.player_id == player);

    let mut correct = 0;
    let mut total = 0;
    for placement in &ranking.placements {
        let owner = owner_of_tier.get(&placement.tier_id).copied().flatten();
        for song in &placement.songs {
            if own.is_some_and(|own| own.contains_song(song)) {
                continue;
            }
            total += 1;
            if owner.is_some_and(|owner| owner.contains_song(song)) {
                correct += 1;
            }
        }
    }
    (correct, total)
}
