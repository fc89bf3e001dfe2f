use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::dispatch::DispatchError;

mod schema;

pub type AppResult<T, E = AppError> = std::result::Result<T, E>;

/// A common error type that can be used throughout the API.
///
/// Every variant is rendered as `{"error": "<message>"}` with a matching status code.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Timeout(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::NoRecipients => Self::ValidationError(e.to_string()),
            DispatchError::NotFound(_) => Self::NotFound(e.to_string()),
            DispatchError::AlreadySending(_) => Self::Conflict(e.to_string()),
            DispatchError::DeadlineExceeded(_) => Self::Timeout(e.to_string()),
            DispatchError::Unexpected(e) => Self::UnexpectedError(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::UnexpectedError(ref e) => tracing::error!("{:?}", e),
            ref e => tracing::warn!("{}", e),
        }

        (
            self.status_code(),
            Json(schema::Error {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
