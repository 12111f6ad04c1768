//! JSON API under `/api/v1`.
//!
//! Same accounts, sessions and posts as the HTML pages. Callers authenticate
//! with the `session_id` cookie or `Authorization: Bearer <session_id>`.

use std::sync::Arc;

use axum::extract::{FromRequest, Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use forum_core::models::{NewAccount, Post, User};

use crate::cookies::{self, SESSION_COOKIE};
use crate::error::ApiError;
use crate::middleware::ApiUser;
use crate::state::AppState;

/// Build the API router, nested at `/api/v1`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/posts", get(list_posts))
        .route("/posts/{id}", get(get_post))
}

/// `Json` whose rejections render as [`ApiError`] bodies.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct ApiJson<T>(T);

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub session_id: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<Post>,
}

async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state
        .accounts
        .register(NewAccount {
            email: body.email,
            username: body.username,
            password: body.password,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let user = state.accounts.authenticate(&body.email, &body.password).await?;
    let token = state.sessions.create(user.id).await;
    let cookie = cookies::session(&token, state.cookie_secure, state.session_cookie_max_age());

    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse {
            session_id: token,
            user,
        }),
    )
        .into_response())
}

async fn logout(State(state): State<Arc<AppState>>, caller: ApiUser) -> Response {
    state.sessions.revoke(&caller.token).await;
    (
        StatusCode::NO_CONTENT,
        AppendHeaders([(SET_COOKIE, cookies::expire(SESSION_COOKIE))]),
    )
        .into_response()
}

async fn me(caller: ApiUser) -> Json<User> {
    Json(caller.user)
}

async fn list_posts(State(state): State<Arc<AppState>>) -> Result<Json<PostListResponse>, ApiError> {
    let posts = state.posts.list().await?;
    Ok(Json(PostListResponse { posts }))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.posts.get(id).await?))
}
