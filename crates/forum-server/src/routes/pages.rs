//! Error page and health check.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use forum_core::models::User;

use crate::cookies;
use crate::error::AppError;
use crate::middleware::Viewer;
use crate::state::AppState;

use super::not_found;

/// Build the router for `/erreur` and `/health`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/erreur", get(error_page).fallback(not_found))
        .route("/health", get(health))
}

#[derive(Serialize)]
struct ErrorPage<'a> {
    viewer: Option<&'a User>,
    message: String,
}

async fn error_page(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let flash = cookies::read_flash(&headers);
    let had_flash = flash.is_some();
    let page = state.templates.render(
        "error.html",
        ErrorPage {
            viewer: viewer.user.as_ref(),
            message: flash.unwrap_or_else(|| "something went wrong".to_owned()),
        },
    )?;
    Ok(cookies::clear_flash(page.into_response(), had_flash))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        sessions: state.sessions.len().await,
    })
}
