use std::fmt;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::dao::models::GameEntity;

/// Lifecycle phase of a game, derived from its deadline and `revealed` flag on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Before the deadline: submissions may be created, changed and withdrawn.
    Open,
    /// Deadline passed, reveal not committed yet.
    Locked,
    /// Reveal committed; rankings are accepted.
    Revealed,
}

impl SessionPhase {
    /// Compute the phase of `game` at `now` (epoch seconds).
    pub fn of(game: &GameEntity, now: i64) -> Self {
        if now < game.deadline {
            SessionPhase::Open
        } else if game.revealed {
            SessionPhase::Revealed
        } else {
            SessionPhase::Locked
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionPhase::Open => "open",
            SessionPhase::Locked => "locked",
            SessionPhase::Revealed => "revealed",
        })
    }
}

/// Operations whose legality depends on the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOperation {
    /// Create or update the caller's submission.
    Submit,
    /// Withdraw the caller's submission.
    Withdraw,
    /// Run the reveal pipeline.
    Reveal,
    /// Record a ranking.
    Rank,
    /// Read the game view.
    Read,
}

impl fmt::Display for SessionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionOperation::Submit => "submit",
            SessionOperation::Withdraw => "withdraw",
            SessionOperation::Reveal => "reveal",
            SessionOperation::Rank => "rank",
            SessionOperation::Read => "read",
        })
    }
}

/// Error returned when an operation is not allowed in the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {operation} while the game is {phase}")]
pub struct InvalidOperation {
    /// Phase the game was in.
    pub phase: SessionPhase,
    /// Operation that was attempted.
    pub operation: SessionOperation,
}

/// Check that `operation` is legal in `phase`.
pub fn ensure_allowed(
    phase: SessionPhase,
    operation: SessionOperation,
) -> Result<(), InvalidOperation> {
    let allowed = match (phase, operation) {
        (_, SessionOperation::Read) => true,
        (SessionPhase::Open, SessionOperation::Submit | SessionOperation::Withdraw) => true,
        (SessionPhase::Locked, SessionOperation::Reveal) => true,
        (SessionPhase::Revealed, SessionOperation::Rank) => true,
        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(InvalidOperation { phase, operation })
    }
}
