use mongodb::error::{
    Error as MongoError, ErrorKind, TRANSIENT_TRANSACTION_ERROR, WriteFailure,
};
use thiserror::Error;

use crate::dao::storage::{Constraint, StorageError};

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("missing environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB transaction failed")]
    Transaction {
        #[source]
        source: MongoError,
    },
    #[error("failed to {action} in collection `{collection}`")]
    Operation {
        action: &'static str,
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("document `{id}` in collection `{collection}` holds a malformed identifier")]
    Corrupt {
        collection: &'static str,
        id: String,
        #[source]
        source: uuid::Error,
    },
    /// A domain rule rejected the write; surfaced unchanged to callers.
    #[error(transparent)]
    Rejected(StorageError),
}

impl MongoDaoError {
    pub(super) fn operation(
        action: &'static str,
        collection: &'static str,
    ) -> impl FnOnce(MongoError) -> Self {
        move |source| MongoDaoError::Operation {
            action,
            collection,
            source,
        }
    }

    /// Like [`MongoDaoError::operation`], but turns unique-index violations into conflicts.
    pub(super) fn write(
        action: &'static str,
        collection: &'static str,
    ) -> impl FnOnce(MongoError) -> Self {
        move |source| match duplicate_key_constraint(&source) {
            Some(constraint) => MongoDaoError::Rejected(StorageError::Conflict(constraint)),
            None => MongoDaoError::Operation {
                action,
                collection,
                source,
            },
        }
    }

    /// Whether the driver flagged the failure as safe to retry with a fresh transaction.
    pub(super) fn is_transient(&self) -> bool {
        match self {
            MongoDaoError::Transaction { source } | MongoDaoError::Operation { source, .. } => {
                source.contains_label(TRANSIENT_TRANSACTION_ERROR)
            }
            _ => false,
        }
    }
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::Rejected(inner) => inner,
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

/// Index names double as constraint tags; see `MongoGameStore::ensure_indexes`.
pub(super) const SUBMISSION_PLAYER_INDEX: &str = "submission_player_idx";
pub(super) const SUBMISSION_NICKNAME_INDEX: &str = "submission_nickname_idx";
pub(super) const SUBMISSION_SONG_INDEX: &str = "submission_song_idx";
pub(super) const RANKING_PLAYER_INDEX: &str = "ranking_player_idx";

fn duplicate_key_constraint(err: &MongoError) -> Option<Constraint> {
    let message = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE => {
            write.message.as_str()
        }
        ErrorKind::Command(command) if command.code == DUPLICATE_KEY_CODE => {
            command.message.as_str()
        }
        _ => return None,
    };

    [
        (SUBMISSION_PLAYER_INDEX, Constraint::SubmissionPerPlayer),
        (SUBMISSION_NICKNAME_INDEX, Constraint::NicknamePerGame),
        (SUBMISSION_SONG_INDEX, Constraint::SongPerGame),
        (RANKING_PLAYER_INDEX, Constraint::RankingPerTierlist),
    ]
    .into_iter()
    .find(|(index, _)| message.contains(index))
    .map(|(_, constraint)| constraint)
}
