//! Cookie helpers.
//!
//! Two cookies are used. `session_id` carries the login token. `error` is a
//! flash cookie holding a URL-encoded message shown once on the next page.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "session_id";
/// Name of the flash message cookie.
pub const FLASH_COOKIE: &str = "error";
/// Flash messages survive this many seconds if never displayed.
pub const FLASH_MAX_AGE_SECS: u32 = 10;

/// Value of the cookie `name` from the request's `Cookie` headers.
#[must_use]
pub fn read(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_owned())
}

/// `Set-Cookie` value for a new session.
#[must_use]
pub fn session(token: &str, secure: bool, max_age: Option<i64>) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    if let Some(secs) = max_age {
        cookie.push_str(&format!("; Max-Age={secs}"));
    }
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that deletes the cookie `name`.
#[must_use]
pub fn expire(name: &str) -> String {
    format!("{name}=; Path=/; Max-Age=0")
}

/// `Set-Cookie` value carrying a flash message.
#[must_use]
pub fn flash(message: &str) -> String {
    format!(
        "{FLASH_COOKIE}={}; Path=/; Max-Age={FLASH_MAX_AGE_SECS}; SameSite=Lax",
        urlencoding::encode(message)
    )
}

/// The pending flash message, decoded.
#[must_use]
pub fn read_flash(headers: &HeaderMap) -> Option<String> {
    let raw = read(headers, FLASH_COOKIE)?;
    let decoded = urlencoding::decode(&raw).ok()?.into_owned();
    (!decoded.is_empty()).then_some(decoded)
}

/// Redirect to `to` with `message` queued as a flash.
pub fn redirect_with_flash(to: &str, message: &str) -> Response {
    (
        AppendHeaders([(SET_COOKIE, flash(message))]),
        Redirect::to(to),
    )
        .into_response()
}

/// Consume the flash shown on this page: clear the cookie on the response.
pub fn clear_flash(mut response: Response, had_flash: bool) -> Response {
    if had_flash {
        response.headers_mut().append(
            SET_COOKIE,
            HeaderValue::from_static("error=; Path=/; Max-Age=0"),
        );
    }
    response
}
