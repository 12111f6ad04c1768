//! Serves uploaded images and videos from the media backend.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use forum_core::media;

use crate::error::AppError;
use crate::state::AppState;

use super::not_found;

/// Build the media router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/img_video/{key}", get(serve_media).fallback(not_found))
}

async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let bytes = state
        .media
        .load(&key)
        .await?
        .ok_or_else(|| AppError::NotFound("page not found".to_owned()))?;

    Ok((
        [
            (CONTENT_TYPE, media::content_type(&key)),
            // Keys are never reused, so the bytes behind one never change.
            (CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        bytes,
    )
        .into_response())
}
