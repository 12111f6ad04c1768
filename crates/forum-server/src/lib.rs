//! Forum HTTP server.
//!
//! Wires the account, session, post and media stores from `forum-core` into
//! an Axum router serving the HTML pages, the uploaded media, static assets
//! and a small JSON API at `/api/v1`.

pub mod config;
pub mod cookies;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod templates;

use std::sync::Arc;

use axum::http::header::{X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS};
use axum::http::HeaderValue;
use axum::middleware as axum_mw;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::session_middleware;
use crate::state::AppState;

/// Build the full application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let (max_upload, max_uploads_in_flight) = (state.max_upload_bytes, state.max_concurrent_uploads);

    Router::new()
        .merge(routes::home::router())
        .merge(routes::auth::router())
        .merge(routes::posts::router(max_upload, max_uploads_in_flight))
        .merge(routes::profile::router(max_upload, max_uploads_in_flight))
        .merge(routes::media::router())
        .merge(routes::pages::router())
        .nest("/api/v1", routes::api::router())
        .nest_service("/static", ServeDir::new(&state.static_dir))
        .nest_service("/images", ServeDir::new(&state.images_dir))
        .fallback(routes::not_found)
        .layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            session_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state)
}
