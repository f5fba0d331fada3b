use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::{
    auth::AuthError,
    catalog::CatalogError,
    dao::{integrity::IntegrityError, storage::StorageError},
    state::session::InvalidOperation,
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Missing or invalid credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Operation is not legal in the game's current phase.
    #[error(transparent)]
    InvalidPhase(#[from] InvalidOperation),
    /// A uniqueness rule rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),
    /// A ranking was attempted before the guess it depends on.
    #[error("precedence: {0}")]
    Precedence(String),
    /// Caller is authenticated but not allowed to act on this resource.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The external catalog or playlist service failed.
    #[error("upstream service failed")]
    Upstream(#[source] CatalogError),
    /// Another caller is revealing the game; retry shortly.
    #[error("reveal in progress, retry shortly")]
    RevealPending,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict(constraint) => ServiceError::Conflict(constraint.to_string()),
            missing @ StorageError::Missing { .. } => ServiceError::NotFound(missing.to_string()),
            closed @ StorageError::SubmissionsClosed { .. } => {
                // The deadline passed between the phase check and the write.
                ServiceError::Conflict(closed.to_string())
            }
            not_member @ StorageError::NotMember { .. } => {
                ServiceError::Forbidden(not_member.to_string())
            }
            StorageError::LeaseLost { .. } => ServiceError::RevealPending,
            other => ServiceError::Unavailable(other),
        }
    }
}

impl From<IntegrityError> for ServiceError {
    fn from(err: IntegrityError) -> Self {
        match err {
            invalid @ IntegrityError::Invalid { .. } => ServiceError::InvalidInput(invalid.to_string()),
            IntegrityError::Storage(storage) => storage.into(),
        }
    }
}

impl From<CatalogError> for ServiceError {
    fn from(err: CatalogError) -> Self {
        ServiceError::Upstream(err)
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        ServiceError::Unauthorized(err.to_string())
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated but not allowed.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// A required earlier step has not been completed.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    /// An upstream dependency failed.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable(source) => {
                error!(error = %source, "storage failure");
                AppError::ServiceUnavailable(source.to_string())
            }
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidPhase(invalid) => AppError::Conflict(invalid.to_string()),
            ServiceError::Conflict(message) => AppError::Conflict(message),
            ServiceError::Precedence(message) => AppError::PreconditionFailed(message),
            ServiceError::Forbidden(message) => AppError::Forbidden(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::Upstream(source) => {
                error!(error = %source, "upstream catalog failure");
                AppError::BadGateway(source.to_string())
            }
            ServiceError::RevealPending => {
                AppError::ServiceUnavailable("reveal in progress, retry shortly".into())
            }
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Unauthorized(err.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
