use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use repomark_core::{AnnotationPatch, RepoSnapshot};

use crate::{auth::Claims, error::ApiError, AppState};

/// `repo` is any JSON object; it is stored verbatim
#[derive(Debug, Deserialize)]
pub struct CreateBookmarkRequest {
    #[serde(default)]
    pub repo: Option<RepoSnapshot>,
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// POST /api/repos/bookmark
pub async fn create_bookmark(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<CreateBookmarkRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    // An unreadable body, or a repo that is not an object, carries no repository
    let repo = match body {
        Ok(Json(req)) => req.repo,
        Err(rejection) => {
            debug!("Unreadable bookmark body: {}", rejection);
            None
        }
    };

    let bookmark = state
        .bookmarks
        .create(&claims.sub, repo)
        .await
        .map_err(ApiError::during("Error saving bookmark"))?;

    Ok((StatusCode::CREATED, Json(bookmark)))
}

/// GET /api/repos/bookmarks
pub async fn list_bookmarks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let bookmarks = state
        .bookmarks
        .list_by_owner(&claims.sub)
        .await
        .map_err(ApiError::during("Error fetching bookmarks"))?;

    Ok(Json(bookmarks))
}

/// DELETE /api/repos/bookmark/{id}
pub async fn delete_bookmark(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .bookmarks
        .delete_by_id(&claims.sub, &id)
        .await
        .map_err(ApiError::during("Error deleting bookmark"))?;

    Ok(Json(json!({ "message": "Bookmark deleted successfully" })))
}

/// PATCH /api/repos/bookmark/{id}
pub async fn update_bookmark(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    body: Result<Json<AnnotationPatch>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(patch) = body.map_err(|rejection| {
        debug!("Unreadable annotation body: {}", rejection);
        ApiError::BadRequest("Expected a JSON body with note and/or tags".to_string())
    })?;

    let bookmark = state
        .bookmarks
        .update_annotations(&claims.sub, &id, patch)
        .await
        .map_err(ApiError::during("Error updating bookmark"))?;

    Ok(Json(bookmark))
}
