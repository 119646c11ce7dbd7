use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use repomark_core::Error as CoreError;

pub const UNAUTHORIZED: &str = "Unauthorized";

/// Everything a handler can answer with besides success
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// `context` is the client-facing message, `source` goes in `error`
    #[error("{context}: {source}")]
    Internal {
        context: &'static str,
        source: CoreError,
    },
}

impl ApiError {
    /// Map a service error, tagging storage-side failures with `context`.
    ///
    /// Meant for `map_err(ApiError::during("Error saving bookmark"))`.
    pub fn during(context: &'static str) -> impl Fn(CoreError) -> ApiError {
        move |err| match err {
            CoreError::ValidationError(msg) => ApiError::BadRequest(msg),
            CoreError::NotFound(msg) => ApiError::NotFound(msg),
            source => ApiError::Internal { context, source },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": UNAUTHORIZED })),
            )
                .into_response(),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
            }
            ApiError::Internal { context, source } => {
                tracing::error!("{}: {}", context, source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": context, "error": source.to_string() })),
                )
                    .into_response()
            }
        }
    }
}
