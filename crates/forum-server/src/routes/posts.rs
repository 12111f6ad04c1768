//! Post pages: publishing, listing, details and comments.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{any, get};
use axum::{Form, Router};
use serde::{Deserialize, Serialize};
use tower::limit::ConcurrencyLimitLayer;
use tracing::info;

use forum_core::error::{MediaError, PostError};
use forum_core::media;
use forum_core::models::{AttachmentKind, NewPost, Post, User};

use crate::cookies;
use crate::error::AppError;
use crate::middleware::{SignedIn, Viewer};
use crate::state::AppState;

use super::not_found;

/// Build the posts router. Upload routes get the configured body limit.
pub fn router(max_upload_bytes: usize, max_concurrent_uploads: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/newpost",
            get(new_post_page)
                .post(create_post)
                .fallback(not_found)
                .layer::<_, Infallible>(DefaultBodyLimit::max(max_upload_bytes))
                .layer::<_, Infallible>(ConcurrencyLimitLayer::new(max_concurrent_uploads)),
        )
        .route("/posts", get(list_posts).fallback(not_found))
        .route(
            "/details/{id}",
            get(post_details).post(add_comment).fallback(not_found),
        )
        .route("/details/", any(missing_post_id))
}

#[derive(Serialize)]
struct PostsPage<'a> {
    viewer: Option<&'a User>,
    posts: &'a [Post],
    flash: Option<String>,
}

#[derive(Serialize)]
struct DetailPage<'a> {
    viewer: Option<&'a User>,
    post: &'a Post,
    flash: Option<String>,
}

async fn new_post_page(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let flash = cookies::read_flash(&headers);
    let had_flash = flash.is_some();
    let page = state.templates.render(
        "new_post.html",
        PostsPage {
            viewer: viewer.user.as_ref(),
            posts: &[],
            flash,
        },
    )?;
    Ok(cookies::clear_flash(page.into_response(), had_flash))
}

/// A post form as read from the multipart body.
#[derive(Debug, Default)]
struct PostUpload {
    title: String,
    content: String,
    files: Vec<(String, Bytes)>,
}

async fn read_post_upload(multipart: &mut Multipart) -> Result<PostUpload, AppError> {
    let mut upload = PostUpload::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "title" => upload.title = field.text().await?,
            "content" => upload.content = field.text().await?,
            "all" => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let data = field.bytes().await?;
                // An empty file input still sends a nameless, empty part.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                upload.files.push((file_name, data));
            }
            _ => {}
        }
    }
    Ok(upload)
}

/// Reject unsupported formats and extra videos before anything is stored.
fn check_attachments(files: &[(String, Bytes)]) -> Result<(), MediaError> {
    let mut videos = 0_usize;
    for (file_name, _) in files {
        if media::classify(file_name)? == AttachmentKind::Video {
            videos += 1;
        }
    }
    if videos > 1 {
        return Err(MediaError::MultipleVideos);
    }
    Ok(())
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    SignedIn(user): SignedIn,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let upload = read_post_upload(&mut multipart).await?;
    if upload.title.trim().is_empty() {
        return Ok(cookies::redirect_with_flash(
            "/newpost",
            &PostError::MissingTitle.to_string(),
        ));
    }
    check_attachments(&upload.files)?;

    let mut new_post = NewPost {
        user_id: user.id,
        title: upload.title,
        content: upload.content,
        ..NewPost::default()
    };
    let mut stored_keys = Vec::with_capacity(upload.files.len());
    for (file_name, data) in &upload.files {
        let stored = match state.media.store(file_name, data).await {
            Ok(stored) => stored,
            Err(e) => {
                state.media.discard(&stored_keys).await;
                return Err(e.into());
            }
        };
        stored_keys.push(stored.key.clone());
        match stored.kind {
            AttachmentKind::Video => new_post.video = Some(stored.key),
            AttachmentKind::Image => new_post.images.push(stored.key),
        }
    }

    match state.posts.create(new_post).await {
        Ok(post_id) => {
            info!(post_id, user_id = user.id, attachments = stored_keys.len(), "post published");
            Ok(Redirect::to(&format!("/?postID={post_id}")).into_response())
        }
        Err(e) => {
            state.media.discard(&stored_keys).await;
            Err(e.into())
        }
    }
}

async fn list_posts(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
) -> Result<Response, AppError> {
    let posts = state.posts.list().await?;
    let page = state.templates.render(
        "posts.html",
        PostsPage {
            viewer: viewer.user.as_ref(),
            posts: &posts,
            flash: None,
        },
    )?;
    Ok(page.into_response())
}

async fn post_details(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let post = state.posts.get(id).await?;
    let flash = cookies::read_flash(&headers);
    let had_flash = flash.is_some();
    let page = state.templates.render(
        "post_detail.html",
        DetailPage {
            viewer: viewer.user.as_ref(),
            post: &post,
            flash,
        },
    )?;
    Ok(cookies::clear_flash(page.into_response(), had_flash))
}

#[derive(Debug, Deserialize)]
struct CommentForm {
    #[serde(default)]
    comment: String,
}

async fn add_comment(
    State(state): State<Arc<AppState>>,
    SignedIn(user): SignedIn,
    Path(id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Response, AppError> {
    let back = format!("/details/{id}");
    match state.posts.add_comment(id, user.id, &form.comment).await {
        Ok(_) => Ok(Redirect::to(&back).into_response()),
        Err(PostError::EmptyComment) => Ok(cookies::redirect_with_flash(
            &back,
            &PostError::EmptyComment.to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

async fn missing_post_id() -> AppError {
    AppError::BadRequest("missing post id".to_owned())
}
