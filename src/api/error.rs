//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::hub::EmitError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request parameters (unknown event type, bad count, ...).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Unknown client id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Producer handed us an unbroadcastable event.
    #[error(transparent)]
    Emit(#[from] EmitError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Emit(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
