//! HTTP error responses.

use crate::StoreError;
use arena_tictactoe::{GameError, GameId};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable machine-readable code.
    pub error_code: String,
    /// Human-readable description.
    pub message: String,
}

/// A request that could not be served.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::From)]
pub enum ApiError {
    /// No game with this id.
    #[display("Game {} not found", _0)]
    #[from(ignore)]
    NotFound(GameId),
    /// The game refused the operation.
    #[display("{}", _0)]
    Game(GameError),
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(id),
            StoreError::Game(e) => ApiError::Game(e),
        }
    }
}

impl ApiError {
    /// Status code and wire code for this error.
    ///
    /// Unknown games are 404, moves or joins the current state forbids are
    /// 409, and malformed requests are 400.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "GAME_NOT_FOUND"),
            ApiError::Game(e) if e.is_state_conflict() => (StatusCode::CONFLICT, e.code()),
            ApiError::Game(e) => (StatusCode::BAD_REQUEST, e.code()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        warn!(error = %self, %status, "Request rejected");
        let body = ErrorBody {
            error_code: code.to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
