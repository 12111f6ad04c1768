//! Home page: the latest posts.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use forum_core::models::{Post, User};
use forum_core::posts::HOME_PAGE_LIMIT;

use crate::cookies;
use crate::error::AppError;
use crate::middleware::Viewer;
use crate::state::AppState;

use super::not_found;

/// Build the home page router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/",
        get(home_page)
            .post(|| async { Redirect::to("/register") })
            .fallback(not_found),
    )
}

#[derive(Debug, Deserialize)]
struct HomeQuery {
    /// Set after publishing, to highlight the new post.
    #[serde(rename = "postID")]
    post_id: Option<String>,
}

#[derive(Serialize)]
struct HomePage<'a> {
    viewer: Option<&'a User>,
    posts: &'a [Post],
    highlight: Option<i64>,
    flash: Option<String>,
}

async fn home_page(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Query(query): Query<HomeQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let posts = state.posts.latest(HOME_PAGE_LIMIT).await?;
    let highlight = query.post_id.and_then(|id| id.parse::<i64>().ok());
    let flash = cookies::read_flash(&headers);
    let had_flash = flash.is_some();

    let page = state.templates.render(
        "index.html",
        HomePage {
            viewer: viewer.user.as_ref(),
            posts: &posts,
            highlight,
            flash,
        },
    )?;
    Ok(cookies::clear_flash(page.into_response(), had_flash))
}
