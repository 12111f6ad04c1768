//! HTTP error types for the forum server.
//!
//! [`AppError`] is returned by the HTML handlers and renders as a short
//! plain-text page. [`ApiError`] is returned under `/api/v1` and renders as a
//! JSON body with a machine-readable `error` field and a human-readable
//! `message`. Validation failures that should go back to a form are not
//! errors at all: handlers turn them into a flash redirect instead.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use forum_core::error::{AccountError, MediaError, PostError};

/// Error returned from HTML handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The request was malformed.
    #[error("{0}")]
    BadRequest(String),
    /// The page or resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// The upload exceeded the configured body limit.
    #[error("{0}")]
    PayloadTooLarge(String),
    /// Something failed on our side. The detail is logged, not shown.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, format!("400 Bad Request: {msg}")),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, format!("404 {msg}")),
            Self::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("413 Payload Too Large: {msg}"),
            ),
            Self::Internal(msg) => {
                error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "500 Internal Server Error".to_owned(),
                )
            }
        };
        (status, body).into_response()
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::NotFound => Self::NotFound("user not found".to_owned()),
            AccountError::Database(_) => Self::Internal(err.to_string()),
            AccountError::MissingFields
            | AccountError::InvalidEmail
            | AccountError::UsernameTaken
            | AccountError::EmailTaken
            | AccountError::UnknownEmail
            | AccountError::WrongPassword => Self::BadRequest(err.to_string()),
        }
    }
}

impl From<PostError> for AppError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::NotFound { .. } => Self::NotFound("page not found".to_owned()),
            PostError::MissingTitle | PostError::EmptyComment => Self::BadRequest(err.to_string()),
            PostError::Database(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::Unsupported { .. }
            | MediaError::MultipleVideos
            | MediaError::NotAnImage { .. } => Self::BadRequest(err.to_string()),
            MediaError::Storage(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

impl From<minijinja::Error> for AppError {
    fn from(err: minijinja::Error) -> Self {
        Self::Internal(format!("template error: {err:#}"))
    }
}

/// Error returned from JSON API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// No valid session accompanied the request.
    Unauthorized(String),
    /// Requested resource not found.
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// The username or email is already in use.
    Conflict(String),
    /// Internal server error.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            Self::Internal(msg) => {
                error!(error = %msg, "internal API error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UsernameTaken | AccountError::EmailTaken => Self::Conflict(err.to_string()),
            AccountError::UnknownEmail | AccountError::WrongPassword => {
                Self::Unauthorized(err.to_string())
            }
            AccountError::MissingFields | AccountError::InvalidEmail => {
                Self::BadRequest(err.to_string())
            }
            AccountError::NotFound => Self::NotFound(err.to_string()),
            AccountError::Database(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<PostError> for ApiError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::NotFound { .. } => Self::NotFound(err.to_string()),
            PostError::MissingTitle | PostError::EmptyComment => Self::BadRequest(err.to_string()),
            PostError::Database(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
