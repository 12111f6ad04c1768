//! Profile pages: the viewer's own profile and public profiles of others.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use tower::limit::ConcurrencyLimitLayer;
use tracing::info;

use forum_core::error::MediaError;
use forum_core::media;
use forum_core::models::{AttachmentKind, Post, User};

use crate::cookies;
use crate::error::AppError;
use crate::middleware::{SignedIn, Viewer};
use crate::state::AppState;

use super::not_found;

/// Build the profile router. Picture uploads get the configured body limit.
pub fn router(max_upload_bytes: usize, max_concurrent_uploads: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/profil",
            get(own_profile)
                .post(upload_picture)
                .fallback(not_found)
                .layer::<_, Infallible>(DefaultBodyLimit::max(max_upload_bytes))
                .layer::<_, Infallible>(ConcurrencyLimitLayer::new(max_concurrent_uploads)),
        )
        .route("/profilOther", get(other_profile).fallback(not_found))
}

#[derive(Serialize)]
struct ProfilePage<'a> {
    viewer: Option<&'a User>,
    profile: &'a User,
    posts: &'a [Post],
    flash: Option<String>,
}

async fn own_profile(
    State(state): State<Arc<AppState>>,
    SignedIn(user): SignedIn,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let posts = state.posts.by_author(user.id).await?;
    let flash = cookies::read_flash(&headers);
    let had_flash = flash.is_some();
    let page = state.templates.render(
        "profile.html",
        ProfilePage {
            viewer: Some(&user),
            profile: &user,
            posts: &posts,
            flash,
        },
    )?;
    Ok(cookies::clear_flash(page.into_response(), had_flash))
}

async fn upload_picture(
    State(state): State<Arc<AppState>>,
    SignedIn(user): SignedIn,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut picture = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("picture") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let data = field.bytes().await?;
        if !file_name.is_empty() || !data.is_empty() {
            picture = Some((file_name, data));
        }
    }

    let Some((file_name, data)) = picture else {
        return Ok(cookies::redirect_with_flash("/profil", "choose a picture to upload"));
    };

    let kind = match media::classify(&file_name) {
        Ok(kind) => kind,
        Err(e) => return Ok(cookies::redirect_with_flash("/profil", &e.to_string())),
    };
    if kind != AttachmentKind::Image {
        let err = MediaError::NotAnImage { file_name };
        return Ok(cookies::redirect_with_flash("/profil", &err.to_string()));
    }

    let stored = state.media.store(&file_name, &data).await?;
    if let Err(e) = state.accounts.set_profile_picture(user.id, &stored.key).await {
        state.media.discard(std::slice::from_ref(&stored.key)).await;
        return Err(e.into());
    }

    info!(user_id = user.id, key = %stored.key, "profile picture uploaded");
    Ok(Redirect::to("/profil").into_response())
}

#[derive(Debug, Deserialize)]
struct OtherProfileQuery {
    username: Option<String>,
}

async fn other_profile(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Query(query): Query<OtherProfileQuery>,
) -> Result<Response, AppError> {
    let username = query
        .username
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("missing username".to_owned()))?;

    let profile = state
        .accounts
        .find_by_username(username.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_owned()))?;

    let posts = state.posts.by_author(profile.id).await?;
    let page = state.templates.render(
        "profile_other.html",
        ProfilePage {
            viewer: viewer.user.as_ref(),
            profile: &profile,
            posts: &posts,
            flash: None,
        },
    )?;
    Ok(page.into_response())
}
