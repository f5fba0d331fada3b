use std::{error::Error, fmt};

use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Uniqueness rules the storage engines enforce on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// One submission per (player, game).
    SubmissionPerPlayer,
    /// One nickname per game.
    NicknamePerGame,
    /// One catalog id per game, across every submission.
    SongPerGame,
    /// One ranking per (player, tierlist).
    RankingPerTierlist,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Constraint::SubmissionPerPlayer => "player already has a submission in this game",
            Constraint::NicknamePerGame => "nickname is already taken in this game",
            Constraint::SongPerGame => "this song has already been submitted to this game",
            Constraint::RankingPerTierlist => "ranking already submitted for this tierlist",
        };
        f.write_str(message)
    }
}

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A uniqueness rule rejected the write.
    #[error("{0}")]
    Conflict(Constraint),
    /// A referenced row does not exist (or does not belong where the write claims).
    #[error("{entity} `{id}` not found")]
    Missing { entity: &'static str, id: String },
    /// The game deadline passed before the write could commit.
    #[error("game `{game_id}` is no longer accepting submissions")]
    SubmissionsClosed { game_id: String },
    /// The player has never interacted with the game.
    #[error("player is not a participant of game `{game_id}`")]
    NotMember { game_id: String },
    /// The reveal lease expired or was taken over before the commit.
    #[error("reveal lease for game `{game_id}` is no longer held")]
    LeaseLost { game_id: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    pub(crate) fn missing(entity: &'static str, id: impl ToString) -> Self {
        StorageError::Missing {
            entity,
            id: id.to_string(),
        }
    }
}
