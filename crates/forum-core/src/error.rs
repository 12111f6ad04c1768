//! Error types for `forum-core`.
//!
//! Validation failures are separate variants so the server can turn them into
//! user-facing flash messages; database and storage failures are wrapped and
//! reported as internal errors.

use forum_storage::StorageError;

/// Errors from account registration, login, and lookup.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Email, username, or password was left empty.
    #[error("email, username and password are required")]
    MissingFields,

    /// The email address does not look like `local@domain.tld`.
    #[error("invalid email address")]
    InvalidEmail,

    /// Another account already uses this username.
    #[error("username already taken, please choose another one")]
    UsernameTaken,

    /// Another account already uses this email address.
    #[error("email already registered, please choose another one")]
    EmailTaken,

    /// No account is registered with this email.
    #[error("incorrect email or password")]
    UnknownEmail,

    /// The account exists but the password does not match.
    #[error("incorrect password")]
    WrongPassword,

    /// The account was not found by id or username.
    #[error("user not found")]
    NotFound,

    /// The database returned an error.
    #[error("account database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors from session lookup.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session exists for this token.
    #[error("session not found")]
    NotFound,

    /// The session existed but has expired; it has been removed.
    #[error("session expired at {expired_at}")]
    Expired { expired_at: String },
}

/// Errors from post and comment operations.
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    /// The post has no title.
    #[error("a post needs a title")]
    MissingTitle,

    /// The comment is empty or whitespace only.
    #[error("a comment cannot be empty")]
    EmptyComment,

    /// The post does not exist.
    #[error("post {id} not found")]
    NotFound { id: i64 },

    /// The database returned an error.
    #[error("post database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors from attachment classification and storage.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The file extension is not an accepted image or video format.
    #[error("unsupported file format: '{file_name}'")]
    Unsupported { file_name: String },

    /// More than one video was attached to a single post.
    #[error("only one video can be attached to a post")]
    MultipleVideos,

    /// The upload is not an image where an image is required.
    #[error("'{file_name}' is not an image")]
    NotAnImage { file_name: String },

    /// The media backend returned an error.
    #[error("media storage error: {0}")]
    Storage(#[from] StorageError),
}
