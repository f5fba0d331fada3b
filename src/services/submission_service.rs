use tracing::info;

use crate::{
    dao::{integrity::IntegrityError, models::PlayerId, storage::StorageError},
    dto::submission::{SubmissionRequest, SubmissionView},
    error::ServiceError,
    services::game_service::load_game,
    state::{
        SharedState,
        session::{InvalidOperation, SessionOperation, SessionPhase, ensure_allowed},
    },
};

/// Create the caller's submission, or replace its content when one already exists.
pub async fn upsert_submission(
    state: &SharedState,
    player: PlayerId,
    game_id: String,
    request: SubmissionRequest,
) -> Result<SubmissionView, ServiceError> {
    let integrity = state.require_integrity().await?;
    let store = integrity.store().clone();
    let game = load_game(&store, &game_id).await?;
    ensure_allowed(SessionPhase::of(&game, state.now()), SessionOperation::Submit)?;

    let submission = match store.find_submission(game_id, player.clone()).await? {
        Some(existing) => {
            integrity
                .update_submission(&game, existing, request.into())
                .await
        }
        None => {
            integrity
                .insert_submission(&game, player, request.into())
                .await
        }
    }
    .map_err(closed_as_phase_error(SessionOperation::Submit))?;

    info!(
        game_id = %game.id,
        submission_id = %submission.id,
        songs = submission.songs.len(),
        "submission saved"
    );
    Ok(submission.into())
}

/// Withdraw the caller's submission and its guess tier.
pub async fn withdraw_submission(
    state: &SharedState,
    player: PlayerId,
    game_id: String,
) -> Result<(), ServiceError> {
    let integrity = state.require_integrity().await?;
    let game = load_game(integrity.store(), &game_id).await?;
    ensure_allowed(
        SessionPhase::of(&game, state.now()),
        SessionOperation::Withdraw,
    )?;

    let removed = integrity
        .withdraw_submission(&game.id, player)
        .await
        .map_err(closed_as_phase_error(SessionOperation::Withdraw))?;
    if !removed {
        return Err(ServiceError::NotFound(format!(
            "no submission in game `{game_id}`"
        )));
    }

    info!(game_id = %game.id, "submission withdrawn");
    Ok(())
}

/// The store rejects writes landing after the deadline; report those like the phase check does.
fn closed_as_phase_error(
    operation: SessionOperation,
) -> impl FnOnce(IntegrityError) -> ServiceError {
    move |err| match err {
        IntegrityError::Storage(StorageError::SubmissionsClosed { .. }) => {
            ServiceError::InvalidPhase(InvalidOperation {
                phase: SessionPhase::Locked,
                operation,
            })
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::storage::Constraint;

    #[test]
    fn late_store_rejection_is_reported_as_locked() {
        let map = closed_as_phase_error(SessionOperation::Withdraw);
        let err = map(IntegrityError::Storage(StorageError::SubmissionsClosed {
            game_id: "g".into(),
        }));
        match err {
            ServiceError::InvalidPhase(invalid) => {
                assert_eq!(invalid.phase, SessionPhase::Locked);
                assert_eq!(invalid.operation, SessionOperation::Withdraw);
            }
            other => panic!("expected phase error, got {other:?}"),
        }
    }

    #[test]
    fn other_write_failures_keep_their_mapping() {
        let map = closed_as_phase_error(SessionOperation::Submit);
        let err = map(IntegrityError::Storage(StorageError::Conflict(
            Constraint::NicknamePerGame,
        )));
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
