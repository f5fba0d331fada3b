use std::sync::Arc;

use tracing::info;

use crate::{
    dao::{
        game_store::GameStore,
        integrity::{GameDraft, check_game_draft},
        models::{GameEntity, PlayerId},
    },
    dto::game::{CreateGameRequest, GameSummary, GameView},
    error::ServiceError,
    services::reveal_service,
    state::{
        SharedState,
        session::{SessionOperation, SessionPhase, ensure_allowed},
    },
};

/// Create a game owned by `owner`, together with its external playlist.
///
/// The draft is validated before the playlist is created so a rejected request never leaves
/// an orphan playlist behind.
pub async fn create_game(
    state: &SharedState,
    owner: PlayerId,
    request: CreateGameRequest,
) -> Result<GameSummary, ServiceError> {
    let integrity = state.require_integrity().await?;
    let draft = check_game_draft(
        GameDraft {
            name: request.name,
            owner_id: owner,
            deadline: request.deadline,
            song_quota: request.n_songs,
        },
        state.now(),
    )?;

    let description = state.config().playlist_description(&draft.name);
    let playlist_id = state
        .playlists()
        .create_playlist(draft.name.clone(), description)
        .await?;

    let game = integrity.create_game(draft, playlist_id).await?;
    info!(game_id = %game.id, owner = %game.owner_id, deadline = game.deadline, "game created");

    Ok(GameSummary::from(&game))
}

/// Render the game for `player`, revealing it first when the deadline has passed.
pub async fn get_game(
    state: &SharedState,
    player: PlayerId,
    game_id: String,
) -> Result<GameView, ServiceError> {
    let store = state.require_game_store().await?;
    let game = load_game(&store, &game_id).await?;
    ensure_allowed(SessionPhase::of(&game, state.now()), SessionOperation::Read)?;

    store.record_member(game_id.clone(), player.clone()).await?;

    let game = match SessionPhase::of(&game, state.now()) {
        SessionPhase::Open => {
            let submission = store.find_submission(game_id, player).await?;
            return Ok(GameView::Open {
                game: GameSummary::from(&game),
                submission: submission.map(Into::into),
            });
        }
        SessionPhase::Locked => reveal_service::ensure_revealed(state, &store, game).await?,
        SessionPhase::Revealed => game,
    };

    let submissions = store.list_submissions(game_id.clone()).await?;
    let tierlists = store.list_tierlists(game_id.clone()).await?;
    GameView::revealed(&game, &submissions, &tierlists).ok_or_else(|| {
        ServiceError::NotFound(format!("tierlists of game `{game_id}` not found"))
    })
}

/// Delete a game and everything it owns. Only its owner may do so.
pub async fn delete_game(
    state: &SharedState,
    player: PlayerId,
    game_id: String,
) -> Result<(), ServiceError> {
    let store = state.require_game_store().await?;
    let game = load_game(&store, &game_id).await?;
    if game.owner_id != player {
        return Err(ServiceError::Forbidden(
            "only the owner may delete a game".into(),
        ));
    }

    if !store.delete_game(game_id.clone()).await? {
        return Err(ServiceError::NotFound(format!("game `{game_id}` not found")));
    }
    info!(%game_id, "game deleted");
    Ok(())
}

/// Fetch a game or fail with [`ServiceError::NotFound`].
pub(crate) async fn load_game(
    store: &Arc<dyn GameStore>,
    game_id: &str,
) -> Result<GameEntity, ServiceError> {
    store
        .find_game(game_id.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}` not found")))
}
