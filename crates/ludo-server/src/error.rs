//! HTTP-facing error type.
//!
//! [`ApiError`] maps room lifecycle failures onto status codes and
//! renders them as a JSON body `{ "error": ..., "status": ... }` via its
//! [`IntoResponse`] implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ludo_types::RoomIdError;

use crate::store::StoreError;

/// Errors returned by the REST endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested room does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request was well-formed but cannot be honored as given.
    #[error("{0}")]
    BadRequest(String),

    /// The room is no longer accepting this request.
    #[error("{0}")]
    Conflict(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::RoomNotFound(_) => Self::NotFound(message),
            StoreError::RoomFull(_) | StoreError::InvalidInput(_) => Self::BadRequest(message),
            StoreError::GameAlreadyStarted(_) => Self::Conflict(message),
            StoreError::RoomUnavailable(_) | StoreError::CodeSpaceExhausted => {
                Self::Internal(message)
            }
        }
    }
}

impl From<RoomIdError> for ApiError {
    fn from(err: RoomIdError) -> Self {
        Self::BadRequest(format!("invalid room code: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
