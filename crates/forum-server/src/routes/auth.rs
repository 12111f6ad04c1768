//! Registration, login and logout pages.
//!
//! Form validation failures redirect back to the form with the reason in the
//! flash cookie. Successful login sets the `session_id` cookie.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use forum_core::error::AccountError;
use forum_core::models::{NewAccount, User};

use crate::cookies::{self, SESSION_COOKIE};
use crate::error::AppError;
use crate::middleware::Viewer;
use crate::state::AppState;

use super::not_found;

/// Build the auth router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/register",
            get(register_page).post(register).fallback(not_found),
        )
        .route("/login", get(login_page).post(login).fallback(not_found))
        .route("/logout", post(logout).fallback(not_found))
}

// ── Register ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RegisterForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn register_page(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    form_page(&state, "register.html", &viewer, &headers)
}

async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let account = NewAccount {
        email: form.email,
        username: form.username,
        password: form.password,
    };

    match state.accounts.register(account).await {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(AccountError::Database(e)) => Err(AccountError::Database(e).into()),
        Err(e) => Ok(cookies::redirect_with_flash("/register", &e.to_string())),
    }
}

// ── Login ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn login_page(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    form_page(&state, "login.html", &viewer, &headers)
}

async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = match state.accounts.authenticate(&form.email, &form.password).await {
        Ok(user) => user,
        Err(AccountError::Database(e)) => return Err(AccountError::Database(e).into()),
        Err(e) => return Ok(cookies::redirect_with_flash("/login", &e.to_string())),
    };

    let token = state.sessions.create(user.id).await;
    info!(user_id = user.id, "user logged in");

    let cookie = cookies::session(&token, state.cookie_secure, state.session_cookie_max_age());
    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to("/")).into_response())
}

// ── Logout ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LogoutQuery {
    /// End every session of the user, not only this one.
    #[serde(default)]
    everywhere: bool,
}

async fn logout(
    State(state): State<Arc<AppState>>,
    viewer: Viewer,
    Query(query): Query<LogoutQuery>,
) -> Response {
    match (&viewer.user, &viewer.token) {
        (Some(user), _) if query.everywhere => {
            state.sessions.revoke_user(user.id).await;
        }
        (_, Some(token)) => {
            state.sessions.revoke(token).await;
        }
        _ => {}
    }

    (
        AppendHeaders([(SET_COOKIE, cookies::expire(SESSION_COOKIE))]),
        Redirect::to("/"),
    )
        .into_response()
}

#[derive(Serialize)]
struct FormPage<'a> {
    viewer: Option<&'a User>,
    flash: Option<String>,
}

/// Render a form page with its pending flash message.
fn form_page(
    state: &AppState,
    template: &str,
    viewer: &Viewer,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    let flash = cookies::read_flash(headers);
    let had_flash = flash.is_some();
    let page = state.templates.render(
        template,
        FormPage {
            viewer: viewer.user.as_ref(),
            flash,
        },
    )?;
    Ok(cookies::clear_flash(page.into_response(), had_flash))
}
