use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::{integrity::SubmissionDraft, models::SubmissionEntity},
    dto::{
        format_system_time,
        validation::{validate_label, validate_song_list},
    },
};

/// Songs, nickname and drawing a player enters into a game.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmissionRequest {
    #[validate(custom(function = "validate_label"))]
    pub nickname: String,
    /// Catalog ids, exactly as many as the game's quota.
    #[validate(custom(function = "validate_song_list"))]
    pub songs: Vec<String>,
    /// URL or data URI of the player's drawing.
    #[validate(length(min = 1))]
    pub drawing: String,
}

impl From<SubmissionRequest> for SubmissionDraft {
    fn from(request: SubmissionRequest) -> Self {
        Self {
            nickname: request.nickname,
            drawing: request.drawing,
            songs: request.songs,
        }
    }
}

/// A player's own submission as returned to them.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubmissionView {
    pub id: Uuid,
    pub nickname: String,
    pub drawing: String,
    pub songs: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SubmissionEntity> for SubmissionView {
    fn from(submission: SubmissionEntity) -> Self {
        Self {
            id: submission.id,
            nickname: submission.nickname,
            drawing: submission.drawing,
            songs: submission
                .songs
                .into_iter()
                .map(|song| song.catalog_id)
                .collect(),
            created_at: format_system_time(submission.created_at),
            updated_at: format_system_time(submission.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(songs: &[&str]) -> SubmissionRequest {
        SubmissionRequest {
            nickname: "Ace".into(),
            songs: songs.iter().map(|s| s.to_string()).collect(),
            drawing: "https://img/ace.png".into(),
        }
    }

    #[test]
    fn test_submission_request_validation() {
        assert!(request(&["4uLU6hMCjMI75M1A2tKUQC"]).validate().is_ok());
        assert!(request(&["bad"]).validate().is_err());
        assert!(
            request(&["4uLU6hMCjMI75M1A2tKUQC", "4uLU6hMCjMI75M1A2tKUQC"])
                .validate()
                .is_err()
        );

        let mut empty_drawing = request(&["4uLU6hMCjMI75M1A2tKUQC"]);
        empty_drawing.drawing.clear();
        assert!(empty_drawing.validate().is_err());
    }
}
