//! Session middleware and extractors.
//!
//! [`session_middleware`] resolves the session token (from the `session_id`
//! cookie, or an `Authorization: Bearer` header for API clients) and inserts
//! a [`Viewer`] into the request extensions. Handlers then pick the extractor
//! matching how they treat anonymous visitors:
//!
//! - [`Viewer`]: anyone, signed in or not.
//! - [`SignedIn`]: HTML pages; anonymous visitors are redirected to `/login`.
//! - [`ApiUser`]: JSON API; anonymous callers get a `401`.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{Redirect, Response};
use tracing::{debug, warn};

use forum_core::models::User;

use crate::cookies::{self, SESSION_COOKIE};
use crate::error::ApiError;
use crate::state::AppState;

/// Who is making the request.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    /// The signed-in account, if the session is valid.
    pub user: Option<User>,
    /// The presented session token, valid or not.
    pub token: Option<String>,
}

/// Middleware that resolves the session token into a [`Viewer`].
///
/// Never rejects: an unknown or expired token just yields an anonymous viewer.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = session_token(req.headers());

    let user = match &token {
        Some(token) => match state.sessions.lookup(token).await {
            Ok(session) => match state.accounts.find_by_id(session.user_id).await {
                Ok(user) => user,
                Err(e) => {
                    warn!(error = %e, "failed to load session user");
                    None
                }
            },
            Err(e) => {
                debug!(error = %e, "ignoring session token");
                None
            }
        },
        None => None,
    };

    req.extensions_mut().insert(Viewer { user, token });
    next.run(req).await
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = cookies::read(headers, SESSION_COOKIE).filter(|t| !t.is_empty()) {
        return Some(token);
    }
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().cloned().unwrap_or_default())
    }
}

/// A signed-in user on an HTML route.
#[derive(Debug, Clone)]
pub struct SignedIn(pub User);

impl<S: Send + Sync> FromRequestParts<S> for SignedIn {
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Viewer>()
            .and_then(|viewer| viewer.user.clone())
            .map(Self)
            .ok_or_else(|| Redirect::to("/login"))
    }
}

/// A signed-in user on a JSON API route.
#[derive(Debug, Clone)]
pub struct ApiUser {
    pub user: User,
    pub token: String,
}

impl<S: Send + Sync> FromRequestParts<S> for ApiUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let viewer = parts.extensions.get::<Viewer>().cloned().unwrap_or_default();
        match (viewer.user, viewer.token) {
            (Some(user), Some(token)) => Ok(Self { user, token }),
            (None, Some(_)) => Err(ApiError::Unauthorized(
                "invalid or expired session".to_owned(),
            )),
            _ => Err(ApiError::Unauthorized("missing session".to_owned())),
        }
    }
}
